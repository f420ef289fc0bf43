//! Graph construction from real PHP parsed through mago

use phpcfg_analyze::{Analyzer, RoutineGraph};
use phpcfg_core::bound::{BoundExpr, BoundExprKind, BoundStmtKind};
use phpcfg_core::cfg::{BlockKind, Edge};
use phpcfg_core::{BlockId, ControlFlowGraph};
use std::path::Path;

fn graph_of<'a>(file: &'a phpcfg_analyze::FileAnalysis, routine: &str) -> &'a RoutineGraph {
    file.routine(routine)
        .unwrap_or_else(|| panic!("routine {} not found", routine))
}

fn analyze(source: &str) -> phpcfg_analyze::FileAnalysis {
    Analyzer::with_defaults().analyze_source(Path::new("test.php"), source)
}

fn assert_well_formed(graph: &ControlFlowGraph) {
    for block in graph.blocks() {
        if block.is_exit() {
            assert!(block.edge().is_none(), "exit block must not have an edge");
        } else {
            assert!(block.edge().is_some(), "block {} has no edge", block.id());
        }
    }
    let mut ordinals: Vec<_> = graph.blocks().iter().filter_map(|b| b.ordinal()).collect();
    let count = ordinals.len();
    ordinals.sort();
    ordinals.dedup();
    assert_eq!(ordinals.len(), count, "ordinals must be unique");
}

fn expressions(graph: &ControlFlowGraph) -> Vec<&BoundExpr> {
    graph
        .blocks()
        .iter()
        .flat_map(|b| b.statements().iter())
        .filter_map(|s| match &s.kind {
            BoundStmtKind::Expression(e) => Some(e),
            _ => None,
        })
        .collect()
}

fn edge_of(graph: &ControlFlowGraph, id: BlockId) -> &Edge {
    graph.block(id).edge().expect("edge")
}

#[test]
fn test_switch_has_case_blocks() {
    let file = analyze(
        "<?php\nfunction f($x) {\n    switch ($x) {\n        case 1:\n            echo 'one';\n            break;\n        case 2:\n        default:\n            echo 'other';\n    }\n    return $x;\n}\n",
    );
    let graph = &graph_of(&file, "f").graph;
    assert_well_formed(graph);

    let switch = graph
        .blocks()
        .iter()
        .find_map(|b| match b.edge() {
            Some(Edge::Switch(edge)) => Some(edge),
            _ => None,
        })
        .expect("switch edge");

    assert_eq!(switch.case_blocks.len(), 3);
    assert!(switch.case_blocks.iter().all(|id| matches!(graph.block(*id).kind(), BlockKind::Case(_))));
    assert!(graph.block(*switch.case_blocks.last().unwrap()).is_default_case());
    assert!(!graph.block(switch.end).is_dead());
}

#[test]
fn test_try_catch_finally() {
    let file = analyze(
        "<?php\nfunction f() {\n    try {\n        throw new InvalidArgumentException('bad');\n    } catch (LogicException | InvalidArgumentException $e) {\n        echo 1;\n    } catch (Exception $e) {\n        echo 2;\n    } finally {\n        echo 3;\n    }\n}\n",
    );
    let graph = &graph_of(&file, "f").graph;
    assert_well_formed(graph);

    let try_block = graph
        .blocks()
        .iter()
        .find(|b| matches!(b.edge(), Some(Edge::TryCatch(_))))
        .expect("try block")
        .id();
    let Edge::TryCatch(edge) = edge_of(graph, try_block) else {
        unreachable!()
    };
    assert_eq!(edge.catch_blocks.len(), 2);
    assert!(edge.finally.is_some());

    let first = graph.block(edge.catch_blocks[0]).catch_info().unwrap();
    let names: Vec<_> = first.types.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["LogicException", "InvalidArgumentException"]);
    assert!(first.types.iter().all(|t| t.handle.is_some()));

    let sites = graph.throw_sites();
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].try_block, Some(try_block));
    assert_eq!(sites[0].exception_type.as_deref(), Some("InvalidArgumentException"));
    assert_eq!(sites[0].handler(graph), Some(edge.catch_blocks[0]));
}

#[test]
fn test_foreach_edges() {
    let file = analyze("<?php\nforeach ($items as $key => &$value) {\n    $value = $key;\n}\necho 'done';\n");
    let graph = &graph_of(&file, "{main}").graph;
    assert_well_formed(graph);

    let enumeree = graph
        .blocks()
        .iter()
        .find_map(|b| match b.edge() {
            Some(Edge::ForeachEnumeree(edge)) => Some(edge),
            _ => None,
        })
        .expect("enumeree edge");
    assert!(enumeree.aliased);

    let (owner, move_next) = graph
        .blocks()
        .iter()
        .find_map(|b| match b.edge() {
            Some(Edge::ForeachMoveNext(edge)) => Some((b.id(), edge)),
            _ => None,
        })
        .expect("move-next edge");
    assert!(move_next.key.is_some());
    assert!(move_next.enumeree_edge(graph).is_some());
    assert_eq!(owner, enumeree.target);
    assert!(graph.predecessors(owner).contains(&move_next.enumeree_block));
}

#[test]
fn test_continue_in_for_targets_increment() {
    let file = analyze(
        "<?php\nfor ($i = 0; $i < 10; $i++) {\n    if ($i % 2) {\n        continue;\n    }\n    echo $i;\n}\n",
    );
    let graph = &graph_of(&file, "{main}").graph;
    assert_well_formed(graph);
    assert!(graph.unreachable_blocks().iter().all(|id| graph.block(*id).statements().is_empty()));

    let jumps: Vec<_> = graph
        .blocks()
        .iter()
        .filter_map(|b| match b.edge() {
            Some(Edge::Simple(edge)) if edge.syntax.is_some() => Some(edge.target),
            _ => None,
        })
        .collect();
    assert_eq!(jumps.len(), 1);
    // The increment block evaluates `$i++`
    let increment = graph.block(jumps[0]);
    assert!(increment
        .statements()
        .iter()
        .any(|s| matches!(&s.kind, BoundStmtKind::Expression(e) if e.kind_name() == "IncDec")));
}

#[test]
fn test_goto_forms_loop() {
    let file = analyze("<?php\n$i = 0;\nagain:\n$i++;\nif ($i < 3) {\n    goto again;\n}\n");
    let graph = &graph_of(&file, "{main}").graph;
    assert_well_formed(graph);

    let label = graph.label("again").expect("label");
    assert!(label.is_defined() && label.is_used());
    assert!(graph.predecessors(label.block).len() >= 2);
}

#[test]
fn test_methods_see_this_and_fields() {
    let file = analyze(
        "<?php\nclass Counter {\n    private int $count = 0;\n    public function bump() {\n        $this->count++;\n        return $this->count;\n    }\n}\n",
    );
    let routine = graph_of(&file, "Counter::bump");
    assert_well_formed(&routine.graph);
    assert!(routine.graph.diagnostics().is_empty());
    assert!(file.issues.is_empty());
}

#[test]
fn test_static_initializer_is_bound() {
    let file = analyze("<?php\nfunction counter() {\n    static $n = 0, $cache;\n    return ++$n;\n}\n");
    let graph = &graph_of(&file, "counter").graph;

    let vars = graph
        .blocks()
        .iter()
        .flat_map(|b| b.statements().iter())
        .find_map(|s| match &s.kind {
            BoundStmtKind::StaticDecl(vars) => Some(vars),
            _ => None,
        })
        .expect("static declaration");
    assert_eq!(vars.len(), 2);
    let initializer = vars[0].initializer.as_ref().expect("initializer");
    assert_eq!(initializer.kind_name(), "Literal");
    assert!(initializer.constant_value().is_some());
    assert!(vars[1].initializer.is_none());
}

#[test]
fn test_exit_and_die_keep_their_argument() {
    let file = analyze("<?php\nfunction f($ok) {\n    if ($ok) {\n        exit(1);\n    }\n    die(\"x\");\n}\nexit;\n");

    let exits: Vec<_> = expressions(&graph_of(&file, "f").graph)
        .into_iter()
        .filter(|e| e.kind_name() == "Exit")
        .collect();
    assert_eq!(exits.len(), 2);
    for exit in exits {
        let BoundExprKind::Call(call) = &exit.kind else {
            panic!("exit is bound as a call");
        };
        assert_eq!(call.arguments.len(), 1);
        assert!(call.arguments[0].value.constant_value().is_some());
    }

    let bare = expressions(&graph_of(&file, "{main}").graph)
        .into_iter()
        .find(|e| e.kind_name() == "Exit")
        .expect("bare exit");
    let BoundExprKind::Call(call) = &bare.kind else {
        panic!("exit is bound as a call");
    };
    assert!(call.arguments.is_empty());
}

#[test]
fn test_declare_const_and_labels_are_lowered() {
    let file = analyze(
        "<?php\ndeclare(strict_types=1);\nconst LIMIT = 3;\ngoto end;\necho 1;\nend:\necho LIMIT;\n",
    );
    let graph = &graph_of(&file, "{main}").graph;
    assert_well_formed(graph);
    assert!(graph.diagnostics().is_empty());

    assert!(expressions(graph).iter().any(|e| e.kind_name() == "FunctionCall"));
    let label = graph.label("end").expect("label");
    assert!(label.is_defined() && label.is_used());
    assert!(graph
        .unreachable_blocks()
        .iter()
        .any(|id| !graph.block(*id).statements().is_empty()));
}
