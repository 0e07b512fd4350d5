use std::{collections::HashMap, io::Write};

use crate::{backward::topological_order, value::Value};

impl Value {
    /// Write graphviz dot file to the given writer.
    pub fn dot(&self, writer: &mut impl Write) -> std::io::Result<()> {
        let nodes = topological_order(self);
        let ids: HashMap<usize, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id(), i))
            .collect();
        writeln!(writer, "digraph G {{\nrankdir=\"LR\";")?;
        for (id, node) in nodes.iter().enumerate() {
            writeln!(
                writer,
                "a{} [label=\"{} \\ndata:{}, grad:{}\"];",
                id,
                node.label(),
                node.data(),
                node.grad()
            )?;
        }
        for (id, node) in nodes.iter().enumerate() {
            for operand in node.0.op.operands().into_iter().flatten() {
                if let Some(pid) = ids.get(&operand.id()) {
                    writeln!(writer, "a{} -> a{};", pid, id)?;
                }
            }
        }
        writeln!(writer, "}}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_vertices_and_edges() {
        let a = Value::named("a", 1.);
        let b = Value::named("b", 3.);
        let c = a.add(&b);
        c.backward();

        let mut buf = vec![];
        c.dot(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.starts_with("digraph G {"));
        assert!(text.contains("a0 [label=\"a \\ndata:1, grad:1\"];"));
        assert!(text.contains("a1 [label=\"b \\ndata:3, grad:1\"];"));
        assert!(text.contains("a0 -> a2;"));
        assert!(text.contains("a1 -> a2;"));
        assert!(text.trim_end().ends_with('}'));
    }
}
