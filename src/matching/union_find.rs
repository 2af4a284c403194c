/// Disjoint-set forest over `0..n` with path compression and union by rank.
///
/// Every root also carries a `tag`; when two sets merge, the surviving root
/// keeps the smaller of the two tags. The assembler uses it to remember the
/// order in which groups were first created.
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
    tag: Vec<u64>,
}

impl DisjointSet {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
            tag: vec![u64::MAX; n],
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Root of the set containing `i`.
    pub fn find(&mut self, i: usize) -> usize {
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // compress
        let mut node = i;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// Merge the sets of `i` and `j`. Returns the surviving root.
    pub fn union(&mut self, i: usize, j: usize) -> usize {
        let pi = self.find(i);
        let pj = self.find(j);
        if pi == pj {
            return pi;
        }
        let tag = self.tag[pi].min(self.tag[pj]);
        let root = if self.rank[pi] < self.rank[pj] {
            self.parent[pi] = pj;
            pj
        } else if self.rank[pi] > self.rank[pj] {
            self.parent[pj] = pi;
            pi
        } else {
            self.parent[pj] = pi;
            self.rank[pi] += 1;
            pi
        };
        self.tag[root] = tag;
        root
    }

    pub fn same_set(&mut self, i: usize, j: usize) -> bool {
        self.find(i) == self.find(j)
    }

    /// Tag of the set containing `i`.
    pub fn tag(&mut self, i: usize) -> u64 {
        let root = self.find(i);
        self.tag[root]
    }

    /// Set the tag of the set containing `i`.
    pub fn set_tag(&mut self, i: usize, tag: u64) {
        let root = self.find(i);
        self.tag[root] = tag;
    }
}
