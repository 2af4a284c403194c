use std::fmt::Write as _;
use std::path::PathBuf;

/// A periodic source planted in several observations.
struct Source {
    period: f64,
    dm: f64,
    snr: f64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// One candidate line: timestamp, DM, SNR, width, RA, Dec, acceleration,
/// period, beam.
fn candidate_line(
    rng: &mut SimpleRng,
    day: usize,
    period: f64,
    dm: f64,
    snr: f64,
    beam: u32,
) -> String {
    let hour = (rng.next_u64() % 24) as u32;
    let minute = (rng.next_u64() % 60) as u32;
    format!(
        "2025-03-{day:02}T{hour:02}:{minute:02}:00 {dm:.3} {snr:.2} {width:.2} {ra:.4} {dec:.4} {acc:.3} {period:.7} M{beam}",
        width = rng.uniform(0.5, 8.0),
        ra = rng.uniform(270.0, 275.0),
        dec = rng.uniform(-22.0, -19.0),
        acc = rng.gauss(0.0, 2.0),
    )
}

fn main() {
    let mut rng = SimpleRng::new(42);
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"));

    let sources = [
        Source { period: 0.714519, dm: 56.8, snr: 14.0 },
        Source { period: 1.292241, dm: 120.4, snr: 9.5 },
        Source { period: 0.089328, dm: 67.9, snr: 22.0 },
        Source { period: 3.745492, dm: 25.1, snr: 8.0 },
    ];
    let n_files = 6;
    let noise_per_file = 25;

    if let Err(e) = std::fs::create_dir_all(&out_dir) {
        eprintln!("Failed to create {}: {e}", out_dir.display());
        std::process::exit(1);
    }

    let mut planted = 0;
    for f in 0..n_files {
        let day = f + 1;
        let mut body = String::from("# time dm snr width ra dec acc period beam\n");

        for source in &sources {
            // Each source shows up in roughly two thirds of the observations.
            if rng.next_f64() > 0.66 {
                continue;
            }
            let period = source.period * (1.0 + rng.gauss(0.0, 0.0008));
            let dm = source.dm * (1.0 + rng.gauss(0.0, 0.0015));
            let snr = (source.snr + rng.gauss(0.0, 2.0)).max(5.0);
            let _ = writeln!(body, "{}", candidate_line(&mut rng, day, period, dm, snr, 3));
            planted += 1;
        }

        for _ in 0..noise_per_file {
            let beam = 1 + (rng.next_u64() % 4) as u32;
            let period = rng.uniform(0.01, 10.0);
            let dm = rng.uniform(3.0, 800.0);
            let snr = rng.uniform(5.0, 9.0);
            let _ = writeln!(body, "{}", candidate_line(&mut rng, day, period, dm, snr, beam));
        }

        let path = out_dir.join(format!("obs_{day:02}.txt"));
        std::fs::write(&path, body).expect("Failed to write observation file");
    }

    println!(
        "Wrote {n_files} observation files with {planted} planted detections of {} sources to {}",
        sources.len(),
        out_dir.display()
    );
}
