//! Graph dumps: plain text, JSON and Graphviz dot

use crate::frontend::LineIndex;
use crate::RoutineGraph;
use phpcfg_core::bound::{BoundStmt, BoundStmtKind};
use phpcfg_core::cfg::{BasicBlock, BlockKind, Edge};
use serde::Serialize;

/// Output format for graph dumps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpFormat {
    Text,
    Json,
    Dot,
}

impl DumpFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(DumpFormat::Text),
            "json" => Some(DumpFormat::Json),
            "dot" => Some(DumpFormat::Dot),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GraphDump {
    pub routine: String,
    pub start: u32,
    pub exit: u32,
    pub blocks: Vec<BlockDump>,
    pub labels: Vec<LabelDump>,
    pub unreachable: Vec<u32>,
    pub diagnostics: Vec<DiagnosticDump>,
}

#[derive(Debug, Serialize)]
pub struct BlockDump {
    pub id: u32,
    pub kind: &'static str,
    /// Order of discovery; absent for dead blocks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordinal: Option<u32>,
    /// Catch types or the case value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub statements: Vec<StatementDump>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge: Option<EdgeDump>,
}

#[derive(Debug, Serialize)]
pub struct StatementDump {
    pub kind: String,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub kind: &'static str,
    /// `(target, role)` pairs
    pub targets: Vec<(u32, &'static str)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub expressions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LabelDump {
    pub name: String,
    pub block: u32,
    pub defined: bool,
    pub used: bool,
}

#[derive(Debug, Serialize)]
pub struct DiagnosticDump {
    pub code: &'static str,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl GraphDump {
    pub fn new(routine: &RoutineGraph, source: &str) -> Self {
        let lines = LineIndex::new(source);
        let graph = &routine.graph;
        let position = |offset: u32| lines.line_col(source, offset as usize);

        let blocks = graph
            .blocks()
            .iter()
            .map(|block| BlockDump {
                id: block.id().0,
                kind: block.kind_name(),
                ordinal: block.ordinal(),
                detail: block_detail(block),
                statements: block
                    .statements()
                    .iter()
                    .map(|stmt| {
                        let (line, column) = position(stmt.span.start.offset);
                        StatementDump { kind: statement_kind(stmt), line, column }
                    })
                    .collect(),
                edge: block.edge().map(edge_dump),
            })
            .collect();

        let labels = graph
            .labels()
            .iter()
            .map(|(name, info)| LabelDump {
                name: name.clone(),
                block: info.block.0,
                defined: info.is_defined(),
                used: info.is_used(),
            })
            .collect();

        let diagnostics = graph
            .diagnostics()
            .iter()
            .map(|d| {
                let (line, column) = position(d.span.start.offset);
                DiagnosticDump { code: d.code, message: d.message.clone(), line, column }
            })
            .collect();

        Self {
            routine: routine.routine.name.clone(),
            start: graph.start().0,
            exit: graph.exit().0,
            blocks,
            labels,
            unreachable: graph.unreachable_blocks().iter().map(|id| id.0).collect(),
            diagnostics,
        }
    }

    pub fn render(&self, format: DumpFormat) -> String {
        match format {
            DumpFormat::Text => self.to_text(),
            DumpFormat::Json => serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string()),
            DumpFormat::Dot => self.to_dot(),
        }
    }

    pub fn to_text(&self) -> String {
        let mut output = format!("routine {} ({} blocks)\n", self.routine, self.blocks.len());

        for block in &self.blocks {
            let state = match block.ordinal {
                Some(ordinal) => format!("live {}", ordinal),
                None => "dead".to_string(),
            };
            output.push_str(&format!("  #{} {} [{}]", block.id, block.kind, state));
            if let Some(detail) = &block.detail {
                output.push_str(&format!(" {}", detail));
            }
            output.push('\n');

            for stmt in &block.statements {
                output.push_str(&format!("    {} @{}:{}\n", stmt.kind, stmt.line, stmt.column));
            }

            if let Some(edge) = &block.edge {
                let targets: Vec<_> = edge
                    .targets
                    .iter()
                    .map(|(target, role)| if role.is_empty() { format!("#{}", target) } else { format!("{} #{}", role, target) })
                    .collect();
                output.push_str(&format!("    -> {} {}", edge.kind, targets.join(", ")));
                if let Some(end) = edge.end {
                    output.push_str(&format!(", end #{}", end));
                }
                if !edge.expressions.is_empty() {
                    output.push_str(&format!(" ({})", edge.expressions.join(", ")));
                }
                output.push('\n');
            }
        }

        for label in &self.labels {
            output.push_str(&format!(
                "  label {} -> #{}{}{}\n",
                label.name,
                label.block,
                if label.defined { "" } else { " (undefined)" },
                if label.used { "" } else { " (unused)" }
            ));
        }
        for diagnostic in &self.diagnostics {
            output.push_str(&format!(
                "  {} @{}:{}: {}\n",
                diagnostic.code, diagnostic.line, diagnostic.column, diagnostic.message
            ));
        }

        output
    }

    pub fn to_dot(&self) -> String {
        let mut output = format!("digraph \"{}\" {{\n", escape_dot(&self.routine));
        output.push_str("  node [shape=box, fontname=\"monospace\"];\n");

        for block in &self.blocks {
            let mut header = format!("#{} {}", block.id, block.kind);
            if let Some(detail) = &block.detail {
                header.push(' ');
                header.push_str(detail);
            }
            let mut label = escape_dot(&header);
            label.push_str("\\l");
            for stmt in &block.statements {
                label.push_str(&escape_dot(&format!("{} @{}:{}", stmt.kind, stmt.line, stmt.column)));
                label.push_str("\\l");
            }
            let style = if block.ordinal.is_none() { ", style=dashed" } else { "" };
            output.push_str(&format!("  b{} [label=\"{}\"{}];\n", block.id, label, style));
        }

        for block in &self.blocks {
            if let Some(edge) = &block.edge {
                for (target, role) in &edge.targets {
                    if role.is_empty() {
                        output.push_str(&format!("  b{} -> b{};\n", block.id, target));
                    } else {
                        output.push_str(&format!("  b{} -> b{} [label=\"{}\"];\n", block.id, target, role));
                    }
                }
                if let Some(end) = edge.end {
                    output.push_str(&format!("  b{} -> b{} [label=\"end\", style=dotted];\n", block.id, end));
                }
            }
        }

        output.push_str("}\n");
        output
    }
}

fn statement_kind(stmt: &BoundStmt) -> String {
    match &stmt.kind {
        BoundStmtKind::Expression(expr) => expr.kind_name().to_string(),
        BoundStmtKind::FunctionDecl(name) => format!("FunctionDecl {}", name),
        BoundStmtKind::TypeDecl(decl) => format!("TypeDecl {}", decl.name),
        _ => stmt.kind_name().to_string(),
    }
}

fn block_detail(block: &BasicBlock) -> Option<String> {
    match block.kind() {
        BlockKind::Catch(info) => {
            let names: Vec<_> = info.types.iter().map(|t| t.name.as_str()).collect();
            Some(format!("({})", names.join(" | ")))
        }
        BlockKind::Case(info) => Some(match &info.value {
            Some(value) => match value.constant_value() {
                Some(constant) => format!("case {}", constant.to_php_string()),
                None => format!("case {}", value.kind_name()),
            },
            None => "default".to_string(),
        }),
        _ => None,
    }
}

fn edge_dump(edge: &Edge) -> EdgeDump {
    let (targets, end) = match edge {
        Edge::Simple(e) => (vec![(e.target.0, if e.syntax.is_some() { "jump" } else { "" })], None),
        Edge::Leave(e) => (vec![(e.target.0, "")], None),
        Edge::Conditional(e) => (vec![(e.true_target.0, "true"), (e.false_target.0, "false")], None),
        Edge::Switch(e) => (e.case_blocks.iter().map(|b| (b.0, "case")).collect(), Some(e.end.0)),
        Edge::TryCatch(e) => {
            let mut targets = vec![(e.body.0, "body")];
            targets.extend(e.catch_blocks.iter().map(|b| (b.0, "catch")));
            targets.extend(e.finally.iter().map(|b| (b.0, "finally")));
            (targets, Some(e.end.0))
        }
        Edge::ForeachEnumeree(e) => (vec![(e.target.0, if e.aliased { "by-ref" } else { "" })], None),
        Edge::ForeachMoveNext(e) => (vec![(e.body.0, "next"), (e.end.0, "done")], None),
    };

    EdgeDump {
        kind: edge.kind_name(),
        targets,
        end,
        expressions: edge.expressions().iter().map(|expr| expr.kind_name().to_string()).collect(),
    }
}

fn escape_dot(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Analyzer;
    use std::path::Path;

    const SOURCE: &str = "<?php\nfunction foo($x) {\n    if ($x) {\n        return 1;\n    }\n    return 2;\n}\n";

    fn dump() -> GraphDump {
        let file = Analyzer::with_defaults().analyze_source(Path::new("test.php"), SOURCE);
        GraphDump::new(file.routine("foo").unwrap(), SOURCE)
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!(DumpFormat::from_str("DOT"), Some(DumpFormat::Dot));
        assert_eq!(DumpFormat::from_str("yaml"), None);
    }

    #[test]
    fn test_text_dump() {
        let text = dump().to_text();
        assert!(text.starts_with("routine foo"));
        assert!(text.contains("start"));
        assert!(text.contains("exit"));
        assert!(text.contains("-> conditional true #"));
        assert!(text.contains("Return @4:9"));
    }

    #[test]
    fn test_json_dump() {
        let json = dump().render(DumpFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["routine"], "foo");
        assert!(value["blocks"].as_array().unwrap().len() >= 4);
    }

    #[test]
    fn test_dot_dump() {
        let dot = dump().to_dot();
        assert!(dot.starts_with("digraph \"foo\" {"));
        assert!(dot.contains("[label=\"true\"]"));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn test_escape_dot() {
        assert_eq!(escape_dot("App\\User::\"x\""), "App\\\\User::\\\"x\\\"");
    }
}
