//! End-to-end evaluation of programs through the public entry point

use playground_jsonnet::{evaluate_snippet, EvalLimits, JsonnetError};
use proptest::prelude::*;

fn eval_with(source: &str, limits: EvalLimits) -> Result<String, JsonnetError> {
    evaluate_snippet(source, &limits)
}

fn eval(source: &str) -> Result<String, JsonnetError> {
    eval_with(source, EvalLimits::default())
}

fn ok(source: &str) -> String {
    match eval(source) {
        Ok(out) => out,
        Err(err) => panic!("{} failed: {}", source, err),
    }
}

#[test]
fn test_simple_arithmetic_has_no_trailing_newline() {
    assert_eq!(ok("1+1"), "2");
    assert_eq!(ok("local x=1; x+1"), "2");
    assert_eq!(ok("0.1 + 0.2"), "0.30000000000000004");
    assert_eq!(ok("10 / 4"), "2.5");
}

#[test]
fn test_unclosed_brace_reports_position() {
    let err = eval("{").unwrap_err();
    assert!(matches!(err, JsonnetError::Syntax { .. }));
    assert!(!err.to_string().is_empty());
    assert!(err.to_string().contains("line 1"));
}

#[test]
fn test_pretty_output_layout() {
    let out = ok("{b: [1, 2], a: {}, c: []}");
    assert_eq!(out, "{\n   \"a\": { },\n   \"b\": [\n      1,\n      2\n   ],\n   \"c\": [ ]\n}");
}

#[test]
fn test_hidden_fields_are_omitted() {
    assert_eq!(ok("{a: 1, b:: 2}"), "{\n   \"a\": 1\n}");
    assert_eq!(ok("({a:: 1} + {a: 2}).a"), "2");
    assert_eq!(ok("std.length({a:: 1} + {a: 2})"), "0");
    assert_eq!(ok("std.length({a:: 1} + {a::: 2})"), "1");
}

#[test]
fn test_inheritance_and_late_binding() {
    let source = r#"
        local base = { name: "base", greeting: "hello " + self.name };
        (base + { name: "child" }).greeting
    "#;
    assert_eq!(ok(source), "\"hello child\"");
}

#[test]
fn test_super_and_dollar() {
    let source = r#"
        local a = { x: 1, nested: { y: $.x } };
        local b = a { x: 10, z: super.x };
        [b.nested.y, b.z]
    "#;
    assert_eq!(ok(source), "[\n   10,\n   1\n]");
    assert_eq!(ok("({a: 1} + {a+: 2}).a"), "3");
    assert_eq!(ok("({a: 1} + {b: 'a' in super}).b"), "true");
}

#[test]
fn test_comprehensions() {
    assert_eq!(
        ok("[x * y for x in [1, 2] for y in [10, 20] if x + y != 12]"),
        "[\n   10,\n   20,\n   40\n]"
    );
    assert_eq!(
        ok("{[k]: std.length(k) for k in ['a', 'bb']}"),
        "{\n   \"a\": 1,\n   \"bb\": 2\n}"
    );
}

#[test]
fn test_strings() {
    assert_eq!(ok("'a' + 1"), "\"a1\"");
    assert_eq!(ok("'x' + {a: [1]}"), "\"x{\\\"a\\\": [1]}\"");
    assert_eq!(ok("'%s-%03d' % ['id', 7]"), "\"id-007\"");
    assert_eq!(ok("'hello'[1:3]"), "\"el\"");
    assert_eq!(ok("@'c:\\path'"), "\"c:\\\\path\"");
}

#[test]
fn test_stdlib_functions() {
    assert_eq!(ok("std.join(',', std.map(std.toString, std.range(1, 3)))"), "\"1,2,3\"");
    assert_eq!(ok("std.foldl(function(a, b) a + b, [1, 2, 3], 0)"), "6");
    assert_eq!(ok("std.sort([3, 1, 2])"), "[\n   1,\n   2,\n   3\n]");
    assert_eq!(ok("std.uniq(std.sort(['b', 'a', 'b']))"), "[\n   \"a\",\n   \"b\"\n]");
    assert_eq!(ok("std.objectFields({b: 1, a: 2, c:: 3})"), "[\n   \"a\",\n   \"b\"\n]");
    assert_eq!(ok("std.split('a,b,c', ',')[2]"), "\"c\"");
    assert_eq!(ok("std.strReplace('aXbX', 'X', '-')"), "\"a-b-\"");
    assert_eq!(ok("std.mergePatch({a: 1, b: 2}, {b: null, c: 3})"), "{\n   \"a\": 1,\n   \"c\": 3\n}");
    assert_eq!(ok("std.manifestJsonEx({a: [1]}, '  ')"), "\"{\\n  \\\"a\\\": [\\n    1\\n  ]\\n}\"");
    assert_eq!(ok("std.parseInt('-42')"), "-42");
    assert_eq!(ok("std.get({a: 1}, 'b', 'none')"), "\"none\"");
    assert_eq!(ok("std.type(null) + std.type([])"), "\"nullarray\"");
}

#[test]
fn test_laziness() {
    assert_eq!(ok("local boom = error 'never'; {a: boom, b: 2}.b"), "2");
    assert_eq!(ok("local f(x, y) = x; f(1, error 'unused')"), "1");
    assert_eq!(ok("std.length([error 'a', error 'b'])"), "2");
}

#[test]
fn test_runtime_errors() {
    assert_eq!(eval("error 'custom'").unwrap_err().message(), "custom");
    assert!(eval("{a: 1}.b").unwrap_err().message().contains("field does not exist"));
    assert!(eval("1 + 'a' - 1").is_err());
    assert!(eval("assert 1 == 2 : 'nope'; 3").unwrap_err().message().contains("nope"));
    assert!(eval("function(x) x").unwrap_err().message().contains("function"));
}

#[test]
fn test_static_errors() {
    assert!(matches!(eval("undefined_var"), Err(JsonnetError::Static { .. })));
    assert!(matches!(eval("self.x"), Err(JsonnetError::Static { .. })));
}

#[test]
fn test_unsupported_features() {
    assert!(eval("import 'x.libsonnet'").is_err());
    assert!(eval("std.extVar('x')").unwrap_err().message().contains("external variables"));
}

#[test]
fn test_deep_recursion_is_limited() {
    let err = eval("local f(n) = if n == 0 then 0 else 1 + f(n - 1); f(100000)").unwrap_err();
    assert!(matches!(err, JsonnetError::Limit { .. }));
}

#[test]
fn test_moderate_recursion_succeeds() {
    assert_eq!(ok("local f(n) = if n == 0 then 0 else 1 + f(n - 1); f(100)"), "100");
}

#[test]
fn test_recursion_runs_on_a_default_test_thread() {
    assert_eq!(ok("local f(n) = if n == 0 then 0 else 1 + f(n - 1); f(400)"), "400");
}

#[test]
fn test_shift_past_word_width_is_zero() {
    assert_eq!(ok("1 << 70"), "0");
    assert_eq!(ok("-8 >> 70"), "-1");
    assert_eq!(ok("1 << 3"), "8");
}

#[test]
fn test_huge_make_array_is_a_limit_error() {
    let err = eval("std.makeArray(1e15, function(i) i)").unwrap_err();
    assert!(matches!(err, JsonnetError::Limit { .. }));
    let err = eval("std.range(0, 1e15)").unwrap_err();
    assert!(matches!(err, JsonnetError::Limit { .. }));
}

#[test]
fn test_huge_format_width_is_a_limit_error() {
    for source in ["'%1000000000000d' % 1", "'%99999999999999999999d' % 1", "'%.99999999999999f' % 1"] {
        let err = eval(source).unwrap_err();
        assert!(matches!(err, JsonnetError::Limit { .. }), "{}", source);
    }
    assert_eq!(ok("'%5d' % 1"), "\"    1\"");
}

#[test]
fn test_step_limit() {
    let limits = EvalLimits {
        max_steps: 10_000,
        ..EvalLimits::default()
    };
    let err = eval_with("std.length(std.range(1, 100000))", limits).unwrap_err();
    assert!(matches!(err, JsonnetError::Limit { .. }));
}

#[test]
fn test_output_limit() {
    let limits = EvalLimits {
        max_output_bytes: 64,
        ..EvalLimits::default()
    };
    let err = eval_with("std.range(1, 100)", limits).unwrap_err();
    assert!(matches!(err, JsonnetError::Limit { .. }));
}

#[test]
fn test_parse_depth_limit() {
    let source = format!("{}1{}", "[".repeat(2_000), "]".repeat(2_000));
    assert!(matches!(eval(&source), Err(JsonnetError::Syntax { .. })));
}

proptest! {
    #[test]
    fn prop_integer_sums_are_deterministic(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
        let source = format!("local a = {}; local b = {}; a + b", a, b);
        let first = eval(&source).unwrap();
        let second = eval(&source).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first, (a + b).to_string());
    }

    #[test]
    fn prop_string_literals_round_trip(s in "[a-zA-Z0-9 ]{0,40}") {
        let out = eval(&format!("'{}'", s)).unwrap();
        prop_assert_eq!(out, format!("\"{}\"", s));
    }
}
