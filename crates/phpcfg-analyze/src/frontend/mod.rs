//! PHP front end: parses files with mago and lowers them into routines
//!
//! Every file yields one script routine (`{main}`) holding its top-level
//! statements, followed by every function, method and closure declared in it
//! in source order. Class-like declarations are collected separately so the
//! analyzer can build one type table for the whole run.

mod lower;
mod names;

pub use names::NameContext;

use mago_database::file::FileId;
use mago_span::{Position, Span};
use mago_syntax::ast::Program;
use phpcfg_core::ast::{Routine, RoutineKind};
use std::path::Path;

use lower::Lowerer;

/// Name of the routine holding a file's top-level code.
pub const SCRIPT_ROUTINE: &str = "{main}";

/// A class, interface, trait or enum declared in a file.
#[derive(Debug, Clone)]
pub struct TypeDeclaration {
    /// Fully qualified name.
    pub name: String,
    pub parent: Option<String>,
    /// Declared and constructor-promoted properties.
    pub fields: Vec<String>,
    pub span: Span,
}

/// Result of lowering one file.
#[derive(Debug, Clone, Default)]
pub struct LoweredFile {
    pub routines: Vec<Routine>,
    pub declarations: Vec<TypeDeclaration>,
}

impl LoweredFile {
    pub fn routine(&self, name: &str) -> Option<&Routine> {
        self.routines.iter().find(|routine| routine.name.eq_ignore_ascii_case(name))
    }
}

/// Lower a parsed program.
pub fn lower_program(program: &Program<'_>, source: &str, file_id: FileId) -> LoweredFile {
    let mut lowerer = Lowerer::new(source, file_id);
    let body = lowerer.statements(program.statements.iter());

    let mut routines = std::mem::take(&mut lowerer.routines);
    routines.sort_by_key(|routine| routine.span.start.offset);
    routines.insert(
        0,
        Routine {
            name: SCRIPT_ROUTINE.to_string(),
            kind: RoutineKind::Script,
            parameters: Vec::new(),
            uses: Vec::new(),
            body,
            span: Span::new(file_id, Position::new(0), Position::new(source.len() as u32)),
        },
    );

    LoweredFile { routines, declarations: lowerer.declarations }
}

/// Parse and lower a source file. The second value is the parser's error, if any;
/// the lowered file still covers everything the parser recovered.
pub fn parse_source(path: &Path, source: &str) -> (LoweredFile, Option<String>) {
    let arena = bumpalo::Bump::new();
    let file_id = FileId::new(path.to_string_lossy().as_ref());
    let (program, parse_error) = mago_syntax::parser::parse_file_content(&arena, file_id, source);

    let lowered = lower_program(program, source, file_id);
    (lowered, parse_error.map(|error| error.to_string()))
}

/// Byte offset to line/column conversion.
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    /// 1-based line and column (in characters) of a byte offset.
    pub fn line_col(&self, source: &str, offset: usize) -> (usize, usize) {
        let offset = offset.min(source.len());
        let line = self.starts.partition_point(|&start| start <= offset);
        let start = self.starts[line - 1];
        let column = source.get(start..offset).map(|s| s.chars().count()).unwrap_or(offset - start);
        (line, column + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phpcfg_core::ast::{ExprKind, StmtKind, VariableName};

    fn lower(source: &str) -> LoweredFile {
        let (file, error) = parse_source(Path::new("test.php"), source);
        assert!(error.is_none(), "unexpected parse error: {:?}", error);
        file
    }

    #[test]
    fn test_line_index() {
        let source = "<?php\n$a = 1;\n  $b;";
        let index = LineIndex::new(source);
        assert_eq!(index.line_col(source, 0), (1, 1));
        assert_eq!(index.line_col(source, 6), (2, 1));
        assert_eq!(index.line_col(source, 16), (3, 3));
    }

    #[test]
    fn test_script_routine_comes_first() {
        let file = lower("<?php\nfunction foo() { return 1; }\necho foo();\n");
        assert_eq!(file.routines[0].name, SCRIPT_ROUTINE);
        assert_eq!(file.routines[1].name, "foo");
        assert!(matches!(file.routines[1].kind, RoutineKind::Function));
        assert!(file.routine("FOO").is_some());
    }

    #[test]
    fn test_methods_and_declarations() {
        let file = lower(
            "<?php\nnamespace App;\nclass Base {}\nclass User extends Base {\n    public $name, $email;\n    public function __construct(private int $id) {}\n    public static function make() { return new static(1); }\n    abstract function nope();\n}\n",
        );

        let user = file.declarations.iter().find(|d| d.name == "App\\User").unwrap();
        assert_eq!(user.parent.as_deref(), Some("App\\Base"));
        assert_eq!(user.fields, vec!["name", "email", "id"]);

        let make = file.routine("App\\User::make").unwrap();
        assert!(matches!(make.kind, RoutineKind::Method { is_static: true, .. }));
        assert!(file.routine("App\\User::__construct").is_some());
        assert!(file.routine("App\\User::nope").is_none());
    }

    #[test]
    fn test_closures_become_routines() {
        let file = lower("<?php\n$x = 1;\n$f = function ($a) use (&$x) { return $a + $x; };\n$g = fn($b) => $b * 2;\n");
        assert_eq!(file.routines.len(), 3);

        let closure = &file.routines[1];
        assert_eq!(closure.name, "{closure#1}");
        assert_eq!(closure.uses.len(), 1);
        assert!(closure.uses[0].by_ref);
        assert_eq!(closure.parameters[0].name, "a");

        let arrow = &file.routines[2];
        assert!(matches!(arrow.kind, RoutineKind::ArrowFunction { .. }));
        assert!(matches!(arrow.body[0].kind, StmtKind::Return(Some(_))));
    }

    #[test]
    fn test_goto_and_labels() {
        let file = lower("<?php\ngoto end;\necho 1;\nend:\necho 2;\n");
        let body = &file.routines[0].body;
        assert!(body.iter().any(|s| matches!(&s.kind, StmtKind::Goto(label) if label == "end")));
        assert!(body.iter().any(|s| matches!(&s.kind, StmtKind::Label(label) if label == "end")));
    }

    #[test]
    fn test_assignment_forms() {
        let file = lower("<?php\n$a = 1;\n$b = &$a;\n$a += 2;\n[$c, , $d] = [1, 2, 3];\n");
        let body = &file.routines[0].body;
        let kinds: Vec<_> = body
            .iter()
            .filter_map(|s| match &s.kind {
                StmtKind::Expr(e) => Some(&e.kind),
                _ => None,
            })
            .collect();

        assert!(matches!(kinds[0], ExprKind::Assign { by_ref: false, .. }));
        assert!(matches!(kinds[1], ExprKind::Assign { by_ref: true, .. }));
        assert!(matches!(kinds[2], ExprKind::CompoundAssign { .. }));
        match kinds[3] {
            ExprKind::Assign { target, .. } => match &target.kind {
                ExprKind::List(items) => {
                    assert_eq!(items.len(), 3);
                    assert!(items[1].is_none());
                }
                other => panic!("expected list target, got {:?}", other),
            },
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_catch_types_are_resolved() {
        let file = lower(
            "<?php\nnamespace App;\nuse Lib\\Failure;\ntry { f(); } catch (Failure | \\RuntimeException $e) { echo 1; }\n",
        );
        let body = &file.routines[0].body;
        let StmtKind::Try { catches, .. } = &body[0].kind else {
            panic!("expected try statement");
        };
        let names: Vec<_> = catches[0].types.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(names, vec!["Lib\\Failure", "RuntimeException"]);
        assert!(matches!(
            catches[0].variable.as_ref().map(|v| &v.kind),
            Some(ExprKind::Variable(VariableName::Direct(name))) if name == "e"
        ));
    }
}
