use std::{collections::VecDeque, fmt};

use crate::{Color, Dir, NodeId, RedBlackTree, NIL};

impl<K> RedBlackTree<K> {
    /// Writes the tree as a Graphviz digraph, one rank per tree level.
    ///
    /// Nodes are filled with their color; sentinel children are drawn as points.
    pub fn dotgraph<W>(&self, name: &str, mut w: W) -> fmt::Result
    where
        W: fmt::Write,
        K: fmt::Display,
    {
        if self.root == NIL {
            return write!(w, "digraph \"graph-{name}\" {{}}");
        }

        enum Item {
            Node(NodeId),
            Missing(u32),
        }

        let mut queue = VecDeque::new();
        queue.push_back(Item::Node(self.root));

        write!(
            w,
            "digraph \"graph-{name}\" {{\n subgraph \"subgraph-{name}\" {{"
        )?;

        let mut missing = 0;
        let mut links = String::new();

        while !queue.is_empty() {
            use fmt::Write;

            write!(w, "{{rank=same; ")?;

            for _rank_node in 0..queue.len() {
                let node = match queue.pop_front() {
                    Some(Item::Node(node)) => node,
                    Some(Item::Missing(id)) => {
                        write!(w, "\"graph{name}-missing{id}\" [shape=point]; ")?;
                        continue;
                    }
                    None => break,
                };

                let key = self.key(node);
                let fill = match self.color(node) {
                    Color::Red => "red",
                    Color::Black => "black",
                };
                write!(
                    w,
                    "\"graph{name}-{key}\" [label=\"{key}\", style=filled, fillcolor={fill}, fontcolor=white]; "
                )?;

                for dir in [Dir::Left, Dir::Right] {
                    let child = self.child(node, dir);

                    if child == NIL {
                        queue.push_back(Item::Missing(missing));
                        writeln!(
                            links,
                            "\"graph{name}-{key}\" -> \"graph{name}-missing{missing}\";"
                        )?;
                        missing += 1;
                    } else {
                        let child_key = self.key(child);

                        queue.push_back(Item::Node(child));
                        writeln!(
                            links,
                            "\"graph{name}-{key}\" -> \"graph{name}-{child_key}\";"
                        )?;
                    }
                }
            }

            writeln!(w, "}}")?;
        }

        w.write_str(&links)?;

        w.write_str(" }\n}")
    }
}
