//! The standard library, checked through whole programs

use playground_jsonnet::{evaluate_snippet, EvalLimits, JsonnetError};

fn eval(source: &str) -> Result<String, JsonnetError> {
    evaluate_snippet(source, &EvalLimits::default())
}

fn ok(source: &str) -> String {
    match eval(source) {
        Ok(out) => out,
        Err(err) => panic!("{} failed: {}", source, err),
    }
}

/// Each line is a boolean Jsonnet expression that must hold
fn holds(cases: &[&str]) {
    for case in cases {
        assert_eq!(ok(case), "true", "{}", case);
    }
}

fn runtime_error(source: &str) -> String {
    match eval(source) {
        Err(JsonnetError::Runtime { message, .. }) => message,
        other => panic!("{} should fail at runtime, got {:?}", source, other.map(|_| ())),
    }
}

#[test]
fn test_type_functions() {
    holds(&[
        "std.isString('a') && std.isNumber(1) && std.isBoolean(false)",
        "std.isObject({}) && std.isArray([]) && std.isFunction(std.map)",
        "std.primitiveEquals(1, 1) && !std.primitiveEquals(1, '1')",
        "std.equals({a: [1]}, {a: [1]})",
        "std.length(function(a, b) a) == 2",
        "std.trace('tracing', 5) == 5",
        "std.native('anything') == null",
        "std.thisFile == ''",
        "std.pi > 3.14159 && std.pi < 3.1416",
    ]);
    assert!(runtime_error("std.primitiveEquals([], [])").contains("primitiveEquals"));
}

#[test]
fn test_array_construction() {
    holds(&[
        "std.makeArray(3, function(i) i * i) == [0, 1, 4]",
        "std.range(3, 1) == []",
        "std.repeat('ab', 3) == 'ababab'",
        "std.repeat([1], 2) == [1, 1]",
        "std.slice([1, 2, 3, 4, 5], 1, null, 2) == [2, 4]",
        "std.slice('jsonnet', 0, 4, null) == 'json'",
    ]);
}

#[test]
fn test_higher_order_array_functions() {
    holds(&[
        "std.mapWithIndex(function(i, x) i + x, [10, 20]) == [10, 21]",
        "std.filterMap(function(x) x > 1, function(x) x * 10, [1, 2, 3]) == [20, 30]",
        "std.flatMap(function(x) [x, x], [1, 2]) == [1, 1, 2, 2]",
        "std.flatMap(function(c) c + c, 'ab') == 'aabb'",
        "std.foldr(function(x, acc) acc + x, ['a', 'b', 'c'], '') == 'cba'",
        "std.map(function(c) c + '!', 'ab') == ['a!', 'b!']",
    ]);
}

#[test]
fn test_joining_and_flattening() {
    holds(&[
        "std.join([0], [[1], [2, 3]]) == [1, 0, 2, 3]",
        "std.join('-', ['a', null, 'b']) == 'a-b'",
        "std.deepJoin(['a', ['b', ['c']]]) == 'abc'",
        "std.lines(['x', 'y']) == 'x\\ny\\n'",
        "std.flattenArrays([[1], [], [2, 3]]) == [1, 2, 3]",
        "std.flattenDeepArray([1, [2, [3, [4]]]]) == [1, 2, 3, 4]",
        "std.reverse([1, 2, 3]) == [3, 2, 1]",
    ]);
}

#[test]
fn test_sorting_and_sets() {
    holds(&[
        "std.sort(['bb', 'a', 'ccc'], keyF=std.length) == ['a', 'bb', 'ccc']",
        "std.set([3, 1, 3, 2]) == [1, 2, 3]",
        "std.setMember(2, [1, 2, 3]) && !std.setMember(4, [1, 2, 3])",
        "std.setUnion([1, 3], [2, 3, 4]) == [1, 2, 3, 4]",
        "std.setInter([1, 2, 3], [2, 3, 4]) == [2, 3]",
        "std.setDiff([1, 2, 3], [2]) == [1, 3]",
        "std.setMember('B', ['a', 'b'], keyF=std.asciiLower)",
    ]);
}

#[test]
fn test_searching_arrays() {
    holds(&[
        "std.member([1, 2], 2) && std.member('abc', 'b')",
        "std.count([1, 2, 1], 1) == 2",
        "std.find(1, [1, 2, 1]) == [0, 2]",
        "std.contains([1, 2], 2) && !std.contains([1, 2], 3)",
        "std.remove([1, 2, 1], 1) == [2, 1]",
        "std.removeAt([1, 2, 3], 1) == [1, 3]",
        "std.all([true, true]) && !std.all([true, false]) && std.all([])",
        "std.any([false, true]) && !std.any([])",
    ]);
}

#[test]
fn test_aggregates() {
    holds(&[
        "std.sum([1, 2, 3]) == 6",
        "std.avg([1, 2, 3]) == 2",
        "std.minArray([3, 1, 2]) == 1",
        "std.maxArray(['a', 'ccc', 'bb'], keyF=std.length) == 'ccc'",
        "std.minArray([], onEmpty='none') == 'none'",
    ]);
    assert!(runtime_error("std.avg([])").contains("empty"));
    assert!(runtime_error("std.maxArray([])").contains("at least one element"));
}

#[test]
fn test_object_functions() {
    holds(&[
        "std.objectFieldsAll({a: 1, b:: 2}) == ['a', 'b']",
        "std.objectFieldsEx({a: 1, b:: 2}, true) == ['a', 'b']",
        "std.objectHas({a:: 1}, 'a') == false && std.objectHasAll({a:: 1}, 'a')",
        "std.objectHasEx({a:: 1}, 'a', true)",
        "std.objectValues({b: 2, a: 1, c:: 3}) == [1, 2]",
        "std.objectValuesAll({a: 1, c:: 3}) == [1, 3]",
        "std.objectKeysValues({a: 1}) == [{key: 'a', value: 1}]",
        "std.objectKeysValuesAll({a:: 1}) == [{key: 'a', value: 1}]",
        "std.objectRemoveKey({a: 1, b: 2}, 'a') == {b: 2}",
        "std.mapWithKey(function(k, v) k + v, {a: 'x'}) == {a: 'ax'}",
        "std.get({a:: 1}, 'a', inc_hidden=false) == null",
        "std.get({a:: 1}, 'a') == 1",
    ]);
}

#[test]
fn test_merge_patch_and_prune() {
    holds(&[
        "std.mergePatch({a: {b: 1, c: 2}}, {a: {c: null, d: 3}}) == {a: {b: 1, d: 3}}",
        "std.mergePatch({a: 1}, 'replaced') == 'replaced'",
        "std.prune({a: null, b: [], c: {}, d: [null, 1], e: {f: {}}}) == {d: [1]}",
    ]);
}

#[test]
fn test_math_functions() {
    holds(&[
        "std.abs(-2) == 2 && std.sign(-3) == -1 && std.sign(0) == 0",
        "std.max(1, 2) == 2 && std.min(1, 2) == 1",
        "std.clamp(5, 0, 3) == 3 && std.clamp(-1, 0, 3) == 0",
        "std.pow(2, 10) == 1024",
        "std.exp(0) == 1 && std.log(1) == 0",
        "std.log2(8) == 3 && std.abs(std.log10(1000) - 3) < 1e-12",
        "std.exponent(8) == 4 && std.mantissa(8) == 0.5",
        "std.floor(1.5) == 1 && std.ceil(1.5) == 2 && std.round(2.5) == 3",
        "std.sqrt(16) == 4 && std.hypot(3, 4) == 5",
        "std.sin(0) == 0 && std.cos(0) == 1 && std.tan(0) == 0",
        "std.asin(0) == 0 && std.acos(1) == 0 && std.atan(0) == 0 && std.atan2(0, 1) == 0",
        "std.abs(std.rad2deg(std.deg2rad(90)) - 90) < 1e-9",
        "std.mod(7, 3) == 1 && std.modulo(-7, 3) == -1",
        "std.mod('%d!', 5) == '5!'",
        "std.isEven(4) && std.isOdd(3) && std.isOdd(-3)",
        "std.isInteger(2) && std.isDecimal(2.5) && !std.isDecimal(2)",
        "std.xor(true, false) && std.xnor(true, true)",
    ]);
    assert!(runtime_error("std.log(0)").contains("finite"));
}

#[test]
fn test_string_functions() {
    holds(&[
        "std.codepoint('A') == 65 && std.char(97) == 'a'",
        "std.substr('jsonnet', 4, 3) == 'net'",
        "std.findSubstr('aa', 'aaaa') == [0, 1, 2]",
        "std.startsWith('jsonnet', 'json') && std.endsWith('jsonnet', 'net')",
        "std.stripChars('xxaxx', 'x') == 'a'",
        "std.lstripChars('xxa', 'x') == 'a' && std.rstripChars('axx', 'x') == 'a'",
        "std.trim('  hi\\n') == 'hi'",
        "std.splitLimit('a,b,c', ',', 1) == ['a', 'b,c']",
        "std.splitLimitR('a,b,c', ',', 1) == ['a,b', 'c']",
        "std.splitLimit('a,b,c', ',', -1) == ['a', 'b', 'c']",
        "std.asciiUpper('abC') == 'ABC' && std.asciiLower('ABc') == 'abc'",
        "std.stringChars('ab') == ['a', 'b']",
        "std.equalsIgnoreCase('ABC', 'abc')",
        "std.isEmpty('') && !std.isEmpty('a')",
        "std.format('%s=%d', ['x', 3]) == 'x=3'",
    ]);
}

#[test]
fn test_escaping_and_number_parsing() {
    holds(&[
        r#"std.escapeStringJson('a"b') == '"a\\"b"'"#,
        r#"std.escapeStringPython('a') == '"a"'"#,
        r#"std.escapeStringBash("it's") == "'it'\"'\"'s'""#,
        "std.escapeStringDollars('$x') == '$$x'",
        "std.escapeStringXml('<a & \"b\">') == '&lt;a &amp; &quot;b&quot;&gt;'",
        "std.parseOctal('755') == 493 && std.parseHex('ff') == 255",
        "std.parseInt('42') == 42",
    ]);
    assert!(runtime_error("std.parseHex('xyz')").contains("parseHex"));
}

#[test]
fn test_encodings_and_digests() {
    holds(&[
        "std.base64('hello') == 'aGVsbG8='",
        "std.base64([104, 105]) == 'aGk='",
        "std.base64Decode('aGVsbG8=') == 'hello'",
        "std.base64DecodeBytes('aGk=') == [104, 105]",
        "std.encodeUTF8('é') == [195, 169]",
        "std.decodeUTF8([104, 105]) == 'hi'",
        "std.md5('') == 'd41d8cd98f00b204e9800998ecf8427e'",
        "std.sha1('abc') == 'a9993e364706816aba3e25717850c26c9cd0d89d'",
        "std.sha256('abc') == 'ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad'",
        "std.length(std.sha512('abc')) == 128 && std.length(std.sha3('abc')) == 128",
    ]);
    assert!(runtime_error("std.base64Decode('!!')").contains("base64"));
}

#[test]
fn test_parse_json_and_yaml() {
    holds(&[
        r#"std.parseJson('{"a": [1, true, null]}') == {a: [1, true, null]}"#,
        "std.parseYaml('a: 1\\nb: [x, y]\\n') == {a: 1, b: ['x', 'y']}",
        "std.parseYaml('--- 1\\n--- 2\\n') == [1, 2]",
        "std.parseYaml('1: one') == {'1': 'one'}",
    ]);
    assert!(runtime_error("std.parseJson('{')").contains("parseJson"));
}

#[test]
fn test_manifest_json_variants() {
    holds(&[
        "std.manifestJsonMinified({a: [1, 2]}) == '{\"a\":[1,2]}'",
        "std.manifestJson({a: 1}) == '{\\n    \"a\": 1\\n}'",
    ]);
}

#[test]
fn test_manifest_yaml() {
    holds(&[
        r#"std.manifestYamlDoc({a: [1, 2], b: {c: 'x'}}) == '"a":\n- 1\n- 2\n"b":\n  "c": "x"'"#,
        r#"std.manifestYamlDoc({a: [1]}, indent_array_in_object=true, quote_keys=false) == 'a:\n  - 1'"#,
        r#"std.manifestYamlDoc([[1, 2], {a: 1}]) == '-\n  - 1\n  - 2\n- "a": 1'"#,
        r#"std.manifestYamlDoc({s: 'l1\nl2\n'}) == '"s": |\n  l1\n  l2'"#,
        r#"std.manifestYamlDoc({e: [], o: {}}) == '"e": []\n"o": {}'"#,
        r#"std.manifestYamlStream([1, 'a']) == '---\n1\n---\n"a"\n...\n'"#,
        r#"std.manifestYamlStream([1], c_document_end=false) == '---\n1\n'"#,
    ]);
    assert!(runtime_error("std.manifestYamlStream({})").contains("arrays"));
}

#[test]
fn test_manifest_other_formats() {
    holds(&[
        r#"std.manifestPython({b: [true, null], a: 'x'}) == '{"a": "x", "b": [True, None]}'"#,
        r#"std.manifestPythonVars({x: 1, y: 'z'}) == 'x = 1\ny = "z"\n'"#,
        r#"std.manifestIni({main: {a: 1}, sections: {s: {b: ['x', 'y']}}}) == 'a = 1\n[s]\nb = x\nb = y\n'"#,
        r#"std.manifestXmlJsonml(['a', {href: 'u'}, ['b', 'text'], 'tail']) == '<a href="u"><b>text</b>tail</a>'"#,
    ]);
}

#[test]
fn test_manifest_toml() {
    holds(&[
        r#"std.manifestToml({a: 1, s: 'x'}) == 'a = 1\ns = "x"'"#,
        r#"std.manifestToml({t: {k: true}}) == '\n\n[t]\n  k = true'"#,
        r#"std.manifestToml({arr: [{n: 1}, {n: 2}]}) == '\n\n[[arr]]\n  n = 1\n\n[[arr]]\n  n = 2'"#,
        r#"std.manifestToml({a: [1, 2]}) == 'a = [\n  1,\n  2\n]'"#,
        r#"std.manifestTomlEx({o: {p: {q: 1}}}, '') == '\n\n[o]\n\n\n[o.p]\nq = 1'"#,
        r#"std.manifestToml({'a b': {x: 1}}) == '\n\n["a b"]\n  x = 1'"#,
    ]);
    assert!(runtime_error("std.manifestToml({a: null})").contains("null"));
    assert!(runtime_error("std.manifestToml([])").contains("object"));
}

#[test]
fn test_missing_required_argument() {
    assert!(runtime_error("std.makeArray(3)").contains("missing argument"));
}
