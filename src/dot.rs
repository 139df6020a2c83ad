//! CDD to DOT (Graphviz) conversion.
//!
//! - **Terminal nodes** (0 and 1) are squares at the bottom (sink rank)
//! - **Decision nodes** are ellipses labeled with their clock difference,
//!   grouped by level
//! - **Edges** are labeled with the interval they cover; complemented edges
//!   are dotted with a hollow circle
//! - **Root nodes** are rectangles at the top (source rank)
//!
//! ```
//! use cdd_rs::cdd::Cdd;
//!
//! let cdd = Cdd::default();
//! cdd.add_clocks(3);
//! let f = cdd.interval(1, 0, 0, 4).unwrap();
//! let g = cdd.lower_bound(2, 1, 1).unwrap();
//! let h = cdd.apply_and(f, g);
//!
//! let dot = cdd.to_dot(&[h]).unwrap();
//! assert!(dot.contains("x2-x1"));
//! // Render with: dot -Tpng output.dot -o output.png
//! ```

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::bound::Bound;
use crate::cdd::Cdd;
use crate::reference::Ref;

#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for decision nodes (default: "ellipse")
    pub node_shape: &'static str,
    /// Shape for terminal nodes (default: "square")
    pub terminal_shape: &'static str,
    /// Shape for root nodes (default: "rect")
    pub root_shape: &'static str,
    /// Style for regular edges (default: "solid")
    pub edge_style: &'static str,
    /// Style for complemented edges (default: "dotted")
    pub negated_edge_style: &'static str,
    /// Whether to draw edges into the false terminal (default: false)
    pub show_zero_edges: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            node_shape: "ellipse",
            terminal_shape: "square",
            root_shape: "rect",
            edge_style: "solid",
            negated_edge_style: "dotted",
            show_zero_edges: false,
        }
    }
}

/// Human-readable interval `lower < d <= upper` of one edge.
fn interval_label(lower: Option<Bound>, upper: Bound) -> String {
    let low = match lower {
        None => "-inf".to_string(),
        Some(b) if b.is_strict() => format!("[{}", b.value()),
        Some(b) => format!("({}", b.value()),
    };
    let up = if upper.is_infinity() {
        "inf)".to_string()
    } else if upper.is_strict() {
        format!("{})", upper.value())
    } else {
        format!("{}]", upper.value())
    };
    if lower.is_none() {
        format!("({}, {}", low, up)
    } else {
        format!("{}, {}", low, up)
    }
}

impl Cdd {
    /// Converts the diagrams rooted at `roots` to DOT format.
    ///
    /// Shared nodes are displayed once.
    pub fn to_dot(&self, roots: &[Ref]) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(roots, &DotConfig::default())
    }

    pub fn to_dot_with_config(&self, roots: &[Ref], config: &DotConfig) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "node [shape={}];", config.node_shape)?;

        // Terminal nodes (0 and 1)
        writeln!(dot, "{{ rank=sink")?;
        writeln!(dot, "0 [shape={}, label=\"0\"];", config.terminal_shape)?;
        writeln!(dot, "1 [shape={}, label=\"1\"];", config.terminal_shape)?;
        writeln!(dot, "}}")?;

        let all_nodes = self.descendants(roots.iter().copied());
        let one = self.one().index();

        let mut levels = BTreeMap::<u32, Vec<usize>>::new();
        for &id in all_nodes.iter() {
            if id == one {
                continue;
            }
            let node = Ref::positive(id as u32);
            levels.entry(self.level(node)).or_default().push(id);
        }

        for ids in levels.values_mut() {
            ids.sort_unstable();
            writeln!(dot, "{{ rank=same")?;
            for &id in ids.iter() {
                let pair = self.pair(Ref::positive(id as u32));
                writeln!(dot, "{} [label=\"{}\"];", id, pair)?;
            }
            writeln!(dot, "}}")?;
        }

        for ids in levels.values() {
            for &id in ids.iter() {
                let mut lower = None;
                for e in self.elems(Ref::positive(id as u32)) {
                    let label = interval_label(lower, e.bound);
                    lower = Some(e.bound);

                    if self.is_zero(e.child) {
                        if config.show_zero_edges {
                            writeln!(dot, "{} -> 0 [label=\"{}\", style={}];", id, label, config.edge_style)?;
                        }
                    } else if e.child.is_negated() {
                        writeln!(
                            dot,
                            "{} -> {} [label=\"{}\", style={}, arrowhead=odot];",
                            id,
                            e.child.index(),
                            label,
                            config.negated_edge_style
                        )?;
                    } else {
                        writeln!(
                            dot,
                            "{} -> {} [label=\"{}\", style={}];",
                            id,
                            e.child.index(),
                            label,
                            config.edge_style
                        )?;
                    }
                }
            }
        }

        writeln!(dot, "{{ rank=source")?;
        for (i, root) in roots.iter().enumerate() {
            writeln!(dot, "r{} [shape={}, label=\"{}\"];", i, config.root_shape, root)?;
        }
        writeln!(dot, "}}")?;

        for (i, &root) in roots.iter().enumerate() {
            if self.is_zero(root) {
                writeln!(dot, "r{} -> 0;", i)?;
            } else if root.is_negated() {
                writeln!(dot, "r{} -> {} [arrowhead=odot];", i, root.index())?;
            } else {
                writeln!(dot, "r{} -> {};", i, root.index())?;
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdd::CddConfig;

    fn manager(clocks: usize) -> Cdd {
        let cdd = Cdd::new(CddConfig::default().with_node_capacity(1 << 10));
        cdd.add_clocks(clocks);
        cdd
    }

    #[test]
    fn test_interval_label() {
        assert_eq!(interval_label(None, Bound::lt(3)), "(-inf, 3)");
        assert_eq!(interval_label(Some(Bound::lt(3)), Bound::le(5)), "[3, 5]");
        assert_eq!(interval_label(Some(Bound::le(5)), Bound::INFINITY), "(5, inf)");
    }

    #[test]
    fn test_to_dot_basic() {
        let cdd = manager(2);
        let f = cdd.interval(1, 0, 0, 4).unwrap();
        let dot = cdd.to_dot(&[f]).unwrap();
        assert!(dot.starts_with("digraph {"));
        assert!(dot.ends_with("}\n"));
        assert!(dot.contains("x1-x0"));
        // Stored complemented: the drawn edges cover the outside of [0, 4).
        assert!(dot.contains("(-inf, 0)"));
        assert!(dot.contains("[4, inf)"));
        assert!(dot.contains("arrowhead=odot"));
    }

    #[test]
    fn test_to_dot_constants() {
        let cdd = manager(1);
        let dot = cdd.to_dot(&[cdd.zero(), cdd.one()]).unwrap();
        assert!(dot.contains("r0 -> 0;"));
        assert!(dot.contains("r1 -> 1;"));
    }

    #[test]
    fn test_to_dot_with_config() {
        let cdd = manager(2);
        let f = cdd.lower_bound(1, 0, 2).unwrap();
        let config = DotConfig {
            show_zero_edges: true,
            ..DotConfig::default()
        };
        let dot = cdd.to_dot_with_config(&[f], &config).unwrap();
        assert!(dot.contains("-> 0 [label=\"(-inf, 2)\""));
    }
}
