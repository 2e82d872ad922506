use crate::definition::{
    CompilerGuard, Condition, CopyRule, Document, OptionSet, PackageIdMode, Recipe,
    RecipeMetadata, RequirementDecl, TestingVars,
};
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[error("Failed parsing recipe document")]
pub struct RecipeParserCompoundError {
    #[source_code]
    pub source_code: NamedSource,
    #[related]
    pub(crate) errors: Vec<RecipeParseError>,
}

#[derive(Debug, Diagnostic, Eq, PartialEq, Error)]
#[error("{kind}")]
pub struct RecipeParseError {
    /// Offset in chars of the error.
    #[label("{}", label.unwrap_or("here"))]
    pub span: SourceSpan,

    /// Label text for this span. Defaults to `"here"`.
    pub label: Option<&'static str>,

    /// Suggestion for fixing the parser error.
    #[help]
    pub help: Option<String>,

    /// Specific error kind for this parser error.
    pub kind: &'static str,
}

impl RecipeParseError {
    fn at(span: &SourceSpan, kind: &'static str) -> Self {
        RecipeParseError {
            span: *span,
            label: None,
            help: None,
            kind,
        }
    }
}

const EMPTY_NODES: &[KdlNode] = &[];

pub(crate) trait GetNodes {
    fn nodes(&self) -> &[KdlNode];
}

impl GetNodes for KdlNode {
    fn nodes(&self) -> &[KdlNode] {
        self.children().map_or(EMPTY_NODES, |x| x.nodes())
    }
}

fn named_source(filename: Option<&str>, source: &str) -> NamedSource {
    NamedSource::new(
        filename
            .map(ToString::to_string)
            .unwrap_or_else(|| "[memory.kdl]".to_string()),
        source.to_string(),
    )
}

pub trait ParseDocument {
    fn parse_document(
        input: &KdlDocument,
        source: &str,
        filename: Option<&str>,
    ) -> miette::Result<Self>
    where
        Self: Sized,
    {
        let (data, errors) = Self::parse_document_with_errors(input);
        data.ok_or_else(|| {
            RecipeParserCompoundError {
                source_code: named_source(filename, source),
                errors,
            }
            .into()
        })
    }

    fn parse_document_strict(
        input: &KdlDocument,
        source: &str,
        filename: Option<&str>,
    ) -> miette::Result<Self>
    where
        Self: Sized,
    {
        let (data, errors) = Self::parse_document_with_errors(input);

        match data {
            Some(obj) if errors.is_empty() => Ok(obj),

            _ => Err(RecipeParserCompoundError {
                source_code: named_source(filename, source),
                errors,
            }
            .into()),
        }
    }

    fn parse_document_with_errors(input: &KdlDocument) -> (Option<Self>, Vec<RecipeParseError>)
    where
        Self: Sized;
}

pub trait ParseNode {
    fn parse_node_with_errors(input: &KdlNode) -> (Option<Self>, Vec<RecipeParseError>)
    where
        Self: Sized;
}

#[macro_export]
macro_rules! parse_string_into {
    ($input:ident, $into:expr, $errors:expr, $name:literal) => {{
        use $crate::definition::parsing::extract_single_string_value;

        match extract_single_string_value(
            $input,
            concat!($name, " missing"),
            concat!($name, " should be a string"),
            concat!("only 1 string expected for ", $name),
            concat!($name, " expected a value, property found instead"),
        ) {
            Ok(n) => $into = n.into(),
            Err(e) => $errors.push(e),
        };
    }};
}

#[macro_export]
macro_rules! parse_bool_into {
    ($input:ident, $into:expr, $errors:expr, $name:literal) => {{
        use $crate::definition::parsing::extract_single_bool_value;

        match extract_single_bool_value(
            $input,
            concat!($name, " missing"),
            concat!($name, " should be a bool"),
            concat!("only 1 bool expected for ", $name),
            concat!($name, " expected a value, property found instead"),
        ) {
            Ok(n) => $into = n.into(),
            Err(e) => $errors.push(e),
        };
    }};
}

#[macro_export]
macro_rules! parse_string_list_into {
    ($input:ident, $into:expr, $errors:expr, $name:literal) => {{
        use $crate::definition::parsing::extract_string_values;

        match extract_string_values(
            $input,
            concat!($name, " expects only string values"),
            concat!($name, " expected values, property found instead"),
        ) {
            Ok(n) => $into.extend(n),
            Err(e) => $errors.push(e),
        };
    }};
}

impl ParseDocument for Document {
    fn parse_document_with_errors(input: &KdlDocument) -> (Option<Self>, Vec<RecipeParseError>)
    where
        Self: Sized,
    {
        let mut recipes = vec![];
        let mut errors = vec![];

        for node in input.nodes() {
            match node.name().value() {
                "recipe" => {
                    let (recipe, err) = Recipe::parse_node_with_errors(node);
                    if let Some(recipe) = recipe {
                        recipes.push(recipe);
                    }
                    errors.extend(err);
                }

                _ => errors.push(RecipeParseError {
                    span: *node.name().span(),
                    label: None,
                    help: Some("top level nodes should be `recipe`".to_string()),
                    kind: "unknown top level node",
                }),
            }
        }

        (Some(Document { recipes }), errors)
    }
}

impl ParseNode for Recipe {
    fn parse_node_with_errors(input: &KdlNode) -> (Option<Self>, Vec<RecipeParseError>)
    where
        Self: Sized,
    {
        let mut errors: Vec<RecipeParseError> = vec![];

        let mut metadata = RecipeMetadata {
            name: "<unnamed>".to_string(),
            version: "0.0.0".to_string(),
            ..Default::default()
        };
        let mut found_version = false;
        let mut settings: Vec<String> = vec![];
        let mut options = OptionSet::default();
        let mut exports: Vec<String> = vec![];
        let mut exports_sources: Vec<String> = vec![];
        let mut no_copy_source = false;
        let mut testing = TestingVars::default();
        let mut requires = vec![];
        let mut compiler_guards = vec![];
        let mut package_rules = vec![];
        let mut package_id: Option<PackageIdMode> = None;

        parse_string_into!(input, metadata.name, errors, "name of recipe");
        for node in input.nodes() {
            match node.name().value() {
                "version" => {
                    found_version = true;
                    parse_string_into!(node, metadata.version, errors, "version");
                }

                "license" => {
                    parse_string_into!(node, metadata.license, errors, "license");
                }

                "url" => {
                    parse_string_into!(node, metadata.url, errors, "url");
                }

                "author" => {
                    parse_string_into!(node, metadata.author, errors, "author");
                }

                "description" => {
                    parse_string_into!(node, metadata.description, errors, "description");
                }

                "settings" => {
                    parse_string_list_into!(node, settings, errors, "settings");
                }

                "exports" => {
                    parse_string_list_into!(node, exports, errors, "exports");
                }

                "exports-sources" => {
                    parse_string_list_into!(node, exports_sources, errors, "exports-sources");
                }

                "no-copy-source" => {
                    parse_bool_into!(node, no_copy_source, errors, "no-copy-source");
                }

                "options" => {
                    let (opt, err) = OptionSet::parse_node_with_errors(node);
                    errors.extend(err);

                    if let Some(opt) = opt {
                        options = opt;
                    }
                }

                "testing" => {
                    let (vars, err) = TestingVars::parse_node_with_errors(node);
                    errors.extend(err);

                    if let Some(vars) = vars {
                        testing = vars;
                    }
                }

                "requires" => {
                    let (req, err) = RequirementDecl::parse_node_with_errors(node);
                    errors.extend(err);
                    requires.extend(req);
                }

                "configure" => {
                    let (guards, err) = Vec::<CompilerGuard>::parse_node_with_errors(node);
                    errors.extend(err);
                    compiler_guards.extend(guards.into_iter().flatten());
                }

                "package" => {
                    let (rules, err) = Vec::<CopyRule>::parse_node_with_errors(node);
                    errors.extend(err);
                    package_rules.extend(rules.into_iter().flatten());
                }

                "package-id" => {
                    if package_id.is_some() {
                        errors.push(RecipeParseError {
                            span: *node.span(),
                            label: Some("second definition of package-id here"),
                            help: None,
                            kind: "redefinition of package-id, can only have one mode",
                        });
                        continue;
                    }

                    let mut mode: Option<String> = None;
                    parse_string_into!(node, mode, errors, "package-id mode");

                    match mode.map(|m| PackageIdMode::parse(&m)) {
                        Some(Some(mode)) => package_id = Some(mode),
                        Some(None) => errors.push(RecipeParseError {
                            span: *node.span(),
                            label: None,
                            help: Some("expected `default` or `header-only`".to_string()),
                            kind: "unknown package-id mode",
                        }),
                        None => {}
                    }
                }

                _ => errors.push(RecipeParseError {
                    span: *node.name().span(),
                    label: None,
                    help: None,
                    kind: "unknown recipe node",
                }),
            }
        }

        if !found_version {
            errors.push(RecipeParseError::at(input.span(), "recipe missing version"))
        }

        let recipe = Recipe {
            metadata,
            settings,
            options,
            exports,
            exports_sources,
            no_copy_source,
            testing,
            requires,
            compiler_guards,
            package_rules,
            package_id: package_id.unwrap_or_default(),
        };

        (Some(recipe), errors)
    }
}

impl ParseNode for OptionSet {
    fn parse_node_with_errors(input: &KdlNode) -> (Option<Self>, Vec<RecipeParseError>)
    where
        Self: Sized,
    {
        let mut options = OptionSet::default();
        let mut errors = vec![];

        for node in input.nodes() {
            let dependency = node.name().value();

            for entry in node.entries() {
                let key = match entry.name() {
                    Some(key) => key.value(),
                    None => {
                        errors.push(RecipeParseError {
                            span: *entry.span(),
                            label: None,
                            help: Some(format!("write it as `{} option=value`", dependency)),
                            kind: "dependency options should be properties",
                        });
                        continue;
                    }
                };

                match value_to_string(entry.value()) {
                    Some(value) => options.set(dependency, key, value),
                    None => errors.push(RecipeParseError::at(
                        entry.span(),
                        "option values can not be null",
                    )),
                }
            }
        }

        (Some(options), errors)
    }
}

impl ParseNode for TestingVars {
    fn parse_node_with_errors(input: &KdlNode) -> (Option<Self>, Vec<RecipeParseError>)
    where
        Self: Sized,
    {
        let mut vars = TestingVars::default();
        let mut errors = vec![];

        for node in input.nodes() {
            match node.name().value() {
                "enable-var" => {
                    parse_string_into!(node, vars.enable_var, errors, "enable-var");
                }

                "report-dir-var" => {
                    parse_string_into!(node, vars.report_dir_var, errors, "report-dir-var");
                }

                _ => errors.push(RecipeParseError::at(
                    node.name().span(),
                    "unknown testing variable",
                )),
            }
        }

        (Some(vars), errors)
    }
}

impl ParseNode for RequirementDecl {
    fn parse_node_with_errors(input: &KdlNode) -> (Option<Self>, Vec<RecipeParseError>)
    where
        Self: Sized,
    {
        let mut errors = vec![];
        let (arguments, properties) = split_entries(input);

        let reference = match arguments.as_slice() {
            [single] => match single.value().as_string() {
                Some(v) => Some(v.to_string()),
                None => {
                    errors.push(RecipeParseError::at(
                        single.span(),
                        "requirement reference should be a string",
                    ));
                    None
                }
            },
            _ => {
                errors.push(RecipeParseError {
                    span: *input.span(),
                    label: None,
                    help: Some("write it as `requires \"name/version@user/channel\"`".to_string()),
                    kind: "requires expects exactly one reference",
                });
                None
            }
        };

        let mut private = false;
        let mut when = Condition::Always;

        for entry in properties {
            match entry.name().map(|x| x.value()) {
                Some("private") => match entry.value().as_bool() {
                    Some(v) => private = v,
                    None => errors.push(RecipeParseError::at(
                        entry.span(),
                        "private should be a bool",
                    )),
                },

                Some("when") => match entry.value().as_string().and_then(Condition::parse) {
                    Some(v) => when = v,
                    None => errors.push(RecipeParseError {
                        span: *entry.span(),
                        label: None,
                        help: Some("expected `always` or `testing`".to_string()),
                        kind: "unknown requirement condition",
                    }),
                },

                _ => errors.push(RecipeParseError::at(
                    entry.span(),
                    "unknown requirement property",
                )),
            }
        }

        (
            reference.map(|reference| RequirementDecl {
                reference,
                private,
                when,
            }),
            errors,
        )
    }
}

impl ParseNode for Vec<CompilerGuard> {
    fn parse_node_with_errors(input: &KdlNode) -> (Option<Self>, Vec<RecipeParseError>)
    where
        Self: Sized,
    {
        let mut guards = vec![];
        let mut errors = vec![];

        for node in input.nodes() {
            match node.name().value() {
                "minimum-compiler" => {
                    let (guard, err) = CompilerGuard::parse_node_with_errors(node);
                    errors.extend(err);
                    guards.extend(guard);
                }

                _ => errors.push(RecipeParseError::at(
                    node.name().span(),
                    "unknown configure check",
                )),
            }
        }

        (Some(guards), errors)
    }
}

impl ParseNode for CompilerGuard {
    fn parse_node_with_errors(input: &KdlNode) -> (Option<Self>, Vec<RecipeParseError>)
    where
        Self: Sized,
    {
        let mut errors = vec![];
        let (arguments, properties) = split_entries(input);

        let compiler = match arguments.as_slice() {
            [single] => single.value().as_string().map(ToString::to_string),
            _ => None,
        };

        if compiler.is_none() {
            errors.push(RecipeParseError::at(
                input.span(),
                "minimum-compiler expects exactly one compiler name",
            ));
        }

        let mut minimum = None;
        let mut message = None;

        for entry in properties {
            match entry.name().map(|x| x.value()) {
                Some("version") => {
                    let value = entry.value();
                    let parsed = value
                        .as_f64()
                        .or_else(|| value.as_i64().map(|v| v as f64))
                        .or_else(|| value.as_string().and_then(|v| v.parse().ok()));

                    match parsed {
                        Some(v) => minimum = Some(v),
                        None => errors.push(RecipeParseError::at(
                            entry.span(),
                            "minimum compiler version should be a number",
                        )),
                    }
                }

                Some("message") => match entry.value().as_string() {
                    Some(v) => message = Some(v.to_string()),
                    None => errors.push(RecipeParseError::at(
                        entry.span(),
                        "message should be a string",
                    )),
                },

                _ => errors.push(RecipeParseError::at(
                    entry.span(),
                    "unknown minimum-compiler property",
                )),
            }
        }

        if minimum.is_none() {
            errors.push(RecipeParseError::at(
                input.span(),
                "minimum-compiler requires a version property",
            ));
        }

        let guard = match (compiler, minimum) {
            (Some(compiler), Some(minimum)) => Some(CompilerGuard {
                compiler,
                minimum,
                message,
            }),
            _ => None,
        };

        (guard, errors)
    }
}

impl ParseNode for Vec<CopyRule> {
    fn parse_node_with_errors(input: &KdlNode) -> (Option<Self>, Vec<RecipeParseError>)
    where
        Self: Sized,
    {
        let mut rules = vec![];
        let mut errors = vec![];

        for node in input.nodes() {
            match node.name().value() {
                "copy" => {
                    let (rule, err) = CopyRule::parse_node_with_errors(node);
                    errors.extend(err);
                    rules.extend(rule);
                }

                _ => errors.push(RecipeParseError::at(
                    node.name().span(),
                    "unknown package action",
                )),
            }
        }

        (Some(rules), errors)
    }
}

impl ParseNode for CopyRule {
    fn parse_node_with_errors(input: &KdlNode) -> (Option<Self>, Vec<RecipeParseError>)
    where
        Self: Sized,
    {
        let mut errors = vec![];
        let (arguments, properties) = split_entries(input);

        let mut rule = match arguments.as_slice() {
            [single] => match single.value().as_string() {
                Some(pattern) => CopyRule::new(pattern),
                None => {
                    errors.push(RecipeParseError::at(
                        single.span(),
                        "copy pattern should be a string",
                    ));
                    return (None, errors);
                }
            },
            _ => {
                errors.push(RecipeParseError::at(
                    input.span(),
                    "copy expects exactly one pattern",
                ));
                return (None, errors);
            }
        };

        for entry in properties {
            let value = entry.value();
            match entry.name().map(|x| x.value()) {
                Some("src") => set_string(entry, value, &mut rule.src, &mut errors),
                Some("dst") => set_string(entry, value, &mut rule.dst, &mut errors),
                Some("keep-path") => set_bool(entry, value, &mut rule.keep_path, &mut errors),
                Some("ignore-case") => set_bool(entry, value, &mut rule.ignore_case, &mut errors),
                _ => errors.push(RecipeParseError::at(
                    entry.span(),
                    "unknown copy property",
                )),
            }
        }

        (Some(rule), errors)
    }
}

fn set_string(entry: &KdlEntry, value: &KdlValue, into: &mut String, errors: &mut Vec<RecipeParseError>) {
    match value.as_string() {
        Some(v) => *into = v.to_string(),
        None => errors.push(RecipeParseError::at(entry.span(), "expected a string")),
    }
}

fn set_bool(entry: &KdlEntry, value: &KdlValue, into: &mut bool, errors: &mut Vec<RecipeParseError>) {
    match value.as_bool() {
        Some(v) => *into = v,
        None => errors.push(RecipeParseError::at(entry.span(), "expected a bool")),
    }
}

fn value_to_string(value: &KdlValue) -> Option<String> {
    if let Some(v) = value.as_string() {
        return Some(v.to_string());
    }

    if let Some(v) = value.as_bool() {
        return Some(v.to_string());
    }

    if let Some(v) = value.as_i64() {
        return Some(v.to_string());
    }

    value.as_f64().map(|v| v.to_string())
}

/// Positional arguments first, `key=value` properties second.
fn split_entries(input: &KdlNode) -> (Vec<&KdlEntry>, Vec<&KdlEntry>) {
    input.entries().iter().partition(|x| x.name().is_none())
}

pub(crate) fn extract_single_bool_value(
    input: &KdlNode,
    missing_error: &'static str,
    wrong_type_error: &'static str,
    too_many_error: &'static str,
    property_found_error: &'static str,
) -> Result<bool, RecipeParseError> {
    let entry = extract_single_entry(input, missing_error, too_many_error, property_found_error)?;

    entry
        .value()
        .as_bool()
        .ok_or_else(|| RecipeParseError::at(entry.span(), wrong_type_error))
}

pub(crate) fn extract_single_string_value(
    input: &KdlNode,
    missing_error: &'static str,
    wrong_type_error: &'static str,
    too_many_error: &'static str,
    property_found_error: &'static str,
) -> Result<String, RecipeParseError> {
    let entry = extract_single_entry(input, missing_error, too_many_error, property_found_error)?;

    entry
        .value()
        .as_string()
        .map(ToString::to_string)
        .ok_or_else(|| RecipeParseError::at(entry.span(), wrong_type_error))
}

fn extract_single_entry<'a>(
    input: &'a KdlNode,
    missing_error: &'static str,
    too_many_error: &'static str,
    property_found_error: &'static str,
) -> Result<&'a KdlEntry, RecipeParseError> {
    match input.entries() {
        [] => Err(RecipeParseError::at(input.name().span(), missing_error)),

        [entry] if entry.name().is_some() => {
            Err(RecipeParseError::at(entry.span(), property_found_error))
        }

        [entry] => Ok(entry),

        [first, .., last] => {
            let start_args = first.span().offset();
            let end_args = last.span().offset() + last.span().len();

            let span = SourceSpan::new(start_args.into(), (end_args - start_args).into());
            Err(RecipeParseError::at(&span, too_many_error))
        }
    }
}

pub(crate) fn extract_string_values(
    input: &KdlNode,
    wrong_type_error: &'static str,
    property_found_error: &'static str,
) -> Result<Vec<String>, RecipeParseError> {
    let mut values = vec![];

    for entry in input.entries() {
        if entry.name().is_some() {
            return Err(RecipeParseError::at(entry.span(), property_found_error));
        }

        match entry.value().as_string() {
            Some(v) => values.push(v.to_string()),
            None => return Err(RecipeParseError::at(entry.span(), wrong_type_error)),
        }
    }

    Ok(values)
}
