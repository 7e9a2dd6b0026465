//! Dominator trees (Lengauer-Tarjan) over index-based graphs.

const NONE: usize = usize::MAX;

/// Immediate dominators of every node reachable from a root.
///
/// Nodes are indices into the successor lists passed to [`DominatorTree::compute`].
#[derive(Clone, Debug)]
pub struct DominatorTree {
    root: usize,
    idom: Vec<Option<usize>>,
    reachable: Vec<bool>,
}

impl DominatorTree {
    /// Compute the dominator tree of `successors` rooted at `root`.
    ///
    /// Nodes not reachable from `root` have no dominators and dominate nothing.
    pub fn compute(successors: &[Vec<usize>], root: usize) -> Self {
        let n = successors.len();
        let mut idom = vec![None; n];
        let mut reachable = vec![false; n];
        if root >= n {
            return Self {
                root,
                idom,
                reachable,
            };
        }

        // Depth-first numbering. Below this point nodes are named by DFS number.
        let mut dfnum = vec![NONE; n];
        let mut vertex = Vec::with_capacity(n);
        let mut parent = Vec::with_capacity(n);
        let mut stack = vec![(root, 0usize)];
        dfnum[root] = 0;
        vertex.push(root);
        parent.push(NONE);
        while let Some(top) = stack.last_mut() {
            let (node, next) = *top;
            if let Some(&succ) = successors[node].get(next) {
                top.1 += 1;
                if succ < n && dfnum[succ] == NONE {
                    dfnum[succ] = vertex.len();
                    vertex.push(succ);
                    parent.push(dfnum[node]);
                    stack.push((succ, 0));
                }
            } else {
                stack.pop();
            }
        }

        let count = vertex.len();
        let mut preds: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (v, &node) in vertex.iter().enumerate() {
            for &succ in &successors[node] {
                if succ < n && dfnum[succ] != NONE {
                    preds[dfnum[succ]].push(v);
                }
            }
        }

        let mut forest = Forest::new(count);
        let mut dom = vec![0usize; count];
        let mut bucket: Vec<Vec<usize>> = vec![Vec::new(); count];
        for w in (1..count).rev() {
            for &v in &preds[w] {
                let u = forest.eval(v);
                if forest.semi[u] < forest.semi[w] {
                    forest.semi[w] = forest.semi[u];
                }
            }
            bucket[forest.semi[w]].push(w);
            let p = parent[w];
            forest.link(p, w);
            for v in std::mem::take(&mut bucket[p]) {
                let u = forest.eval(v);
                dom[v] = if forest.semi[u] < forest.semi[v] { u } else { p };
            }
        }
        for w in 1..count {
            if dom[w] != forest.semi[w] {
                dom[w] = dom[dom[w]];
            }
        }

        for (w, &node) in vertex.iter().enumerate() {
            reachable[node] = true;
            if w != 0 {
                idom[node] = Some(vertex[dom[w]]);
            }
        }

        Self {
            root,
            idom,
            reachable,
        }
    }

    pub const fn root(&self) -> usize {
        self.root
    }

    /// Immediate dominator of `node`; `None` for the root and unreachable nodes.
    pub fn immediate_dominator(&self, node: usize) -> Option<usize> {
        self.idom.get(node).copied().flatten()
    }

    pub fn is_reachable(&self, node: usize) -> bool {
        self.reachable.get(node).copied().unwrap_or(false)
    }

    /// Whether every path from the root to `node` passes through `dominator`.
    pub fn dominates(&self, dominator: usize, node: usize) -> bool {
        if !self.is_reachable(dominator) || !self.is_reachable(node) {
            return false;
        }
        let mut current = node;
        loop {
            if current == dominator {
                return true;
            }
            match self.immediate_dominator(current) {
                Some(next) => current = next,
                None => return false,
            }
        }
    }
}

/// Link-eval forest with path compression, indexed by DFS number.
struct Forest {
    semi: Vec<usize>,
    ancestor: Vec<usize>,
    label: Vec<usize>,
}

impl Forest {
    fn new(count: usize) -> Self {
        Self {
            semi: (0..count).collect(),
            ancestor: vec![NONE; count],
            label: (0..count).collect(),
        }
    }

    fn link(&mut self, parent: usize, child: usize) {
        self.ancestor[child] = parent;
    }

    fn eval(&mut self, v: usize) -> usize {
        if self.ancestor[v] == NONE {
            return v;
        }
        self.compress(v);
        self.label[v]
    }

    fn compress(&mut self, v: usize) {
        let mut path = Vec::new();
        let mut x = v;
        while self.ancestor[self.ancestor[x]] != NONE {
            path.push(x);
            x = self.ancestor[x];
        }
        while let Some(x) = path.pop() {
            let a = self.ancestor[x];
            if self.semi[self.label[a]] < self.semi[self.label[x]] {
                self.label[x] = self.label[a];
            }
            self.ancestor[x] = self.ancestor[a];
        }
    }
}
