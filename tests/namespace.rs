//! End-to-end composition scenarios: namespacing, global escapes, diamond
//! includes, tree-shaking, and extensions.

use std::fs;
use std::path::Path;

use serde_json::{json, Value};
use tempfile::TempDir;

use templar::group::TemplateGroup;
use templar::loader::FileSystemLoader;
use templar::TemplarError;

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn group_over(dir: &Path) -> TemplateGroup {
    TemplateGroup::new(FileSystemLoader::new([dir]).with_extensions(["html"]))
}

fn render(dir: &Path, root: &str, entry: &str, data: Value) -> String {
    let mut group = group_over(dir);
    let root = group.load_root(root).unwrap();
    let mut out = String::new();
    group.render(&mut out, root, entry, &data, None).unwrap();
    out
}

#[test]
fn test_basic_namespacing() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "component.html",
        "{{ define \"button\" }}<button>{{ .Text }}</button>{{ end }}\n\
         {{ define \"icon\" }}<i class=\"icon\"></i>{{ end }}",
    );
    write(
        tmp.path(),
        "page.html",
        "{{# namespace \"UI\" \"component.html\" #}}\n\
         {{ define \"page\" }}\n<div>{{ template \"UI:button\" . }}</div>\n{{ end }}",
    );

    let result = render(tmp.path(), "page.html", "page", json!({"Text": "Click Me"}));
    assert!(result.contains("<button>Click Me</button>"), "got: {result}");
}

#[test]
fn test_cross_namespace_global_reference() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "shared.html", r#"{{ define "formatDate" }}2024-01-01{{ end }}"#);
    write(
        tmp.path(),
        "component.html",
        r#"{{ define "card" }}<div class="card">Date: {{ template "::formatDate" . }}</div>{{ end }}"#,
    );
    write(
        tmp.path(),
        "page.html",
        "{{# include \"shared.html\" #}}\n\
         {{# namespace \"Cards\" \"component.html\" #}}\n\
         {{ define \"page\" }}{{ template \"Cards:card\" . }}{{ end }}",
    );

    let result = render(tmp.path(), "page.html", "page", Value::Null);
    assert!(result.contains("Date: 2024-01-01"), "got: {result}");
}

#[test]
fn test_diamond_includes() {
    // Page includes LibA and LibB; both namespace the same shared file.
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "shared.html", r#"{{ define "widget" }}[WIDGET]{{ end }}"#);
    write(
        tmp.path(),
        "libA.html",
        "{{# namespace \"A\" \"shared.html\" #}}\n\
         {{ define \"libA\" }}LibA uses {{ template \"A:widget\" . }}{{ end }}",
    );
    write(
        tmp.path(),
        "libB.html",
        "{{# namespace \"B\" \"shared.html\" #}}\n\
         {{ define \"libB\" }}LibB uses {{ template \"B:widget\" . }}{{ end }}",
    );
    write(
        tmp.path(),
        "page.html",
        "{{# include \"libA.html\" #}}\n\
         {{# include \"libB.html\" #}}\n\
         {{ define \"page\" }}{{ template \"libA\" . }} AND {{ template \"libB\" . }}{{ end }}",
    );

    let result = render(tmp.path(), "page.html", "page", Value::Null);
    assert!(result.contains("LibA uses [WIDGET]"), "got: {result}");
    assert!(result.contains("LibB uses [WIDGET]"), "got: {result}");
}

#[test]
fn test_diamond_registry_holds_both_namespaces() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "shared.html", r#"{{ define "widget" }}[WIDGET]{{ end }}"#);
    write(tmp.path(), "libA.html", r#"{{# namespace "A" "shared.html" #}}"#);
    write(tmp.path(), "libB.html", r#"{{# namespace "B" "shared.html" #}}"#);
    write(
        tmp.path(),
        "page.html",
        "{{# include \"libA.html\" #}}{{# include \"libB.html\" #}}",
    );

    let mut group = group_over(tmp.path());
    let root = group.load_root("page.html").unwrap();
    let registry = group.compose(root).unwrap();
    assert!(registry.contains("A:widget"));
    assert!(registry.contains("B:widget"));
}

#[test]
fn test_empty_namespace_is_an_error() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "component.html", r#"{{ define "button" }}<button/>{{ end }}"#);
    write(
        tmp.path(),
        "page.html",
        "{{# namespace \"\" \"component.html\" #}}\n{{ define \"page\" }}test{{ end }}",
    );

    let mut group = group_over(tmp.path());
    let root = group.load_root("page.html").unwrap();
    let err = group.compose(root).unwrap_err();
    assert!(matches!(err, TemplarError::DirectiveUsage { .. }), "got: {err}");
}

#[test]
fn test_namespace_tree_shaking() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "components.html",
        "{{ define \"used1\" }}USED1{{ end }}\n\
         {{ define \"used2\" }}USED2 calls {{ template \"used3\" . }}{{ end }}\n\
         {{ define \"used3\" }}USED3{{ end }}\n\
         {{ define \"unused1\" }}UNUSED1{{ end }}\n\
         {{ define \"unused2\" }}UNUSED2{{ end }}",
    );
    write(
        tmp.path(),
        "page.html",
        "{{# namespace \"C\" \"components.html\" \"used1\" \"used2\" #}}\n\
         {{ define \"page\" }}{{ template \"C:used1\" . }} {{ template \"C:used2\" . }}{{ end }}",
    );

    let mut group = group_over(tmp.path());
    let root = group.load_root("page.html").unwrap();
    let registry = group.compose(root).unwrap();
    assert!(registry.contains("C:used1"));
    assert!(registry.contains("C:used2"));
    assert!(registry.contains("C:used3"), "transitive dependency must survive the shake");
    assert!(!registry.contains("C:unused1"));
    assert!(!registry.contains("C:unused2"));

    let result = render(tmp.path(), "page.html", "page", Value::Null);
    assert!(result.contains("USED1"), "got: {result}");
    assert!(result.contains("USED2 calls USED3"), "got: {result}");
}

#[test]
fn test_selective_include_without_namespace() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "forms.html",
        "{{ define \"button\" }}<button>Click</button>{{ end }}\n\
         {{ define \"input\" }}<input/>{{ end }}\n\
         {{ define \"select\" }}<select></select>{{ end }}",
    );
    write(
        tmp.path(),
        "page.html",
        "{{# include \"forms.html\" \"button\" #}}\n\
         {{ define \"page\" }}{{ template \"button\" . }}{{ end }}",
    );

    let mut group = group_over(tmp.path());
    let root = group.load_root("page.html").unwrap();
    let registry = group.compose(root).unwrap();
    assert!(registry.contains("button"));
    assert!(!registry.contains("input"));
    assert!(!registry.contains("select"));

    let result = render(tmp.path(), "page.html", "page", Value::Null);
    assert!(result.contains("<button>Click</button>"), "got: {result}");
}

#[test]
fn test_extend_full_override() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "base.html",
        "{{ define \"layout\" }}\n<html>\n<head>{{ template \"title\" . }}</head>\n\
         <body>{{ template \"content\" . }}</body>\n</html>\n{{ end }}\n\
         {{ define \"title\" }}<title>Default Title</title>{{ end }}\n\
         {{ define \"content\" }}<p>Default content</p>{{ end }}",
    );
    write(
        tmp.path(),
        "page.html",
        "{{# namespace \"Base\" \"base.html\" #}}\n\
         {{# extend \"Base:layout\" \"MyLayout\" \"Base:title\" \"myTitle\" \"Base:content\" \"myContent\" #}}\n\n\
         {{ define \"myTitle\" }}<title>My Custom Page</title>{{ end }}\n\
         {{ define \"myContent\" }}<main>Hello World!</main>{{ end }}\n\n\
         {{ template \"MyLayout\" . }}",
    );

    // Empty entry name renders the root record's main tree.
    let result = render(tmp.path(), "page.html", "", Value::Null);
    assert!(result.contains("<title>My Custom Page</title>"), "got: {result}");
    assert!(result.contains("<main>Hello World!</main>"), "got: {result}");
    assert!(result.contains("<html>"), "got: {result}");
}

#[test]
fn test_extend_partial_override_keeps_defaults() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "base.html",
        "{{ define \"layout\" }}\n<header>{{ template \"header\" . }}</header>\n\
         <main>{{ template \"content\" . }}</main>\n\
         <footer>{{ template \"footer\" . }}</footer>\n{{ end }}\n\
         {{ define \"header\" }}Default Header{{ end }}\n\
         {{ define \"content\" }}Default Content{{ end }}\n\
         {{ define \"footer\" }}Default Footer{{ end }}",
    );
    write(
        tmp.path(),
        "page.html",
        "{{# namespace \"Base\" \"base.html\" #}}\n\
         {{# extend \"Base:layout\" \"MyLayout\" \"Base:content\" \"myContent\" #}}\n\n\
         {{ define \"myContent\" }}Custom Content Only{{ end }}\n\n\
         {{ template \"MyLayout\" . }}",
    );

    let result = render(tmp.path(), "page.html", "", Value::Null);
    assert!(result.contains("Default Header"), "got: {result}");
    assert!(result.contains("Custom Content Only"), "got: {result}");
    assert!(result.contains("Default Footer"), "got: {result}");
    assert!(!result.contains("Default Content"), "got: {result}");
}

#[test]
fn test_chained_extensions_in_order() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "listing.html",
        "{{ define \"EntityListing\" }}listing[{{ template \"Grid\" . }}]{{ end }}\n\
         {{ define \"Grid\" }}grid[{{ template \"GridCardPreview\" . }}]{{ end }}\n\
         {{ define \"GridCardPreview\" }}default-preview{{ end }}",
    );
    write(
        tmp.path(),
        "page.html",
        "{{# namespace \"EL\" \"listing.html\" #}}\n\
         {{# extend \"EL:Grid\" \"MyGrid\" \"EL:GridCardPreview\" \"MyPreview\" #}}\n\
         {{# extend \"EL:EntityListing\" \"MyListing\" \"EL:Grid\" \"MyGrid\" #}}\n\
         {{ define \"MyPreview\" }}MY-PREVIEW{{ end }}",
    );

    let result = render(tmp.path(), "page.html", "MyListing", Value::Null);
    assert!(result.contains("MY-PREVIEW"), "got: {result}");
    assert!(!result.contains("default-preview"), "got: {result}");
}

#[test]
fn test_chained_extensions_reversed_fail() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "listing.html",
        "{{ define \"EntityListing\" }}listing[{{ template \"Grid\" . }}]{{ end }}\n\
         {{ define \"Grid\" }}grid[{{ template \"GridCardPreview\" . }}]{{ end }}\n\
         {{ define \"GridCardPreview\" }}default-preview{{ end }}",
    );
    // The outer extension comes first, referencing MyGrid before anything
    // defines it.
    write(
        tmp.path(),
        "page.html",
        "{{# namespace \"EL\" \"listing.html\" #}}\n\
         {{# extend \"EL:EntityListing\" \"MyListing\" \"EL:Grid\" \"MyGrid\" #}}\n\
         {{# extend \"EL:Grid\" \"MyGrid\" \"EL:GridCardPreview\" \"MyPreview\" #}}\n\
         {{ define \"MyPreview\" }}MY-PREVIEW{{ end }}",
    );

    let mut group = group_over(tmp.path());
    let root = group.load_root("page.html").unwrap();
    let err = group.compose(root).unwrap_err();
    assert!(matches!(err, TemplarError::ExtendSourceMissing { .. }), "got: {err}");
}

#[test]
fn test_extend_missing_source_fails() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "page.html",
        r#"{{# extend "NoSuch:layout" "MyLayout" #}}"#,
    );

    let mut group = group_over(tmp.path());
    let root = group.load_root("page.html").unwrap();
    let err = group.compose(root).unwrap_err();
    assert!(
        matches!(err, TemplarError::ExtendSourceMissing { ref source_name, .. } if source_name == "NoSuch:layout"),
        "got: {err}"
    );
}

#[test]
fn test_cyclic_includes_terminate() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "a.html",
        "{{# include \"b.html\" #}}\n{{ define \"a\" }}A{{ end }}",
    );
    write(
        tmp.path(),
        "b.html",
        "{{# include \"a.html\" #}}\n{{ define \"b\" }}B calls {{ template \"a\" . }}{{ end }}",
    );

    let mut group = group_over(tmp.path());
    let root = group.load_root("a.html").unwrap();
    let registry = group.compose(root).unwrap();
    assert!(registry.contains("a"));
    assert!(registry.contains("b"));

    let result = render(tmp.path(), "a.html", "b", Value::Null);
    assert!(result.contains("B calls A"), "got: {result}");
}

#[test]
fn test_nested_namespaces_inherit_through_plain_includes() {
    // outer.html plainly includes inner.html; namespacing outer must carry
    // the prefix down to inner's definitions.
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "inner.html", r#"{{ define "leaf" }}LEAF{{ end }}"#);
    write(
        tmp.path(),
        "outer.html",
        "{{# include \"inner.html\" #}}\n\
         {{ define \"branch\" }}branch[{{ template \"leaf\" . }}]{{ end }}",
    );
    write(
        tmp.path(),
        "page.html",
        "{{# namespace \"N\" \"outer.html\" #}}\n\
         {{ define \"page\" }}{{ template \"N:branch\" . }}{{ end }}",
    );

    let mut group = group_over(tmp.path());
    let root = group.load_root("page.html").unwrap();
    let registry = group.compose(root).unwrap();
    assert!(registry.contains("N:branch"));
    assert!(registry.contains("N:leaf"));

    let result = render(tmp.path(), "page.html", "page", Value::Null);
    assert!(result.contains("branch[LEAF]"), "got: {result}");
}

#[test]
fn test_relative_include_resolves_against_including_file() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("widgets")).unwrap();
    write(
        &tmp.path().join("widgets"),
        "card.html",
        r#"{{ define "card" }}CARD{{ end }}"#,
    );
    write(
        &tmp.path().join("widgets"),
        "deck.html",
        "{{# include \"./card.html\" #}}\n\
         {{ define \"deck\" }}deck[{{ template \"card\" . }}]{{ end }}",
    );
    write(
        tmp.path(),
        "page.html",
        "{{# include \"widgets/deck.html\" #}}\n\
         {{ define \"page\" }}{{ template \"deck\" . }}{{ end }}",
    );

    let result = render(tmp.path(), "page.html", "page", Value::Null);
    assert!(result.contains("deck[CARD]"), "got: {result}");
}

#[test]
fn test_inline_root_record() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "shared.html", r#"{{ define "widget" }}[WIDGET]{{ end }}"#);

    let mut group = group_over(tmp.path());
    let root = templar::Template::inline(
        "inline-root",
        "{{# namespace \"S\" \"shared.html\" #}}\
         {{ define \"page\" }}inline {{ template \"S:widget\" . }}{{ end }}",
    );
    let mut out = String::new();
    group.render(&mut out, root, "page", &Value::Null, None).unwrap();
    assert!(out.contains("inline [WIDGET]"), "got: {out}");
}

#[test]
fn test_render_missing_entry_is_not_found() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "page.html", r#"{{ define "page" }}P{{ end }}"#);

    let mut group = group_over(tmp.path());
    let root = group.load_root("page.html").unwrap();
    let mut out = String::new();
    let err = group.render(&mut out, root, "ghost", &Value::Null, None).unwrap_err();
    assert!(err.is_not_found(), "got: {err}");
}

#[test]
fn test_custom_function_bindings() {
    use std::rc::Rc;
    use templar::engine::{FuncMap, TemplateFunc};

    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "page.html", r#"{{ define "page" }}{{ upper .Word }}{{ end }}"#);

    let mut group = group_over(tmp.path());
    let mut funcs = FuncMap::new();
    funcs.insert(
        "upper".to_string(),
        Rc::new(|args: &[Value]| {
            Ok(Value::String(args[0].as_str().unwrap_or_default().to_uppercase()))
        }) as TemplateFunc,
    );
    group.add_funcs(funcs);

    let root = group.load_root("page.html").unwrap();
    let mut out = String::new();
    group.render(&mut out, root, "page", &json!({"Word": "loud"}), None).unwrap();
    assert_eq!(out, "LOUD");
}
