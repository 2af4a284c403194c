/// Data layer: core types, input filtering, parsing and loading.
///
/// Architecture:
/// ```text
///   data/*.txt
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  keep marker lines → test<n>.txt working copies
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  read file → Dataset (empty on failure)
///   └──────────┘
///        │  per line
///        ▼
///   ┌──────────┐
///   │  parser   │  line → Record (numeric-looking tokens)
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod parser;
