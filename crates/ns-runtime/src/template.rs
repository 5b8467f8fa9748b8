use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::OnceLock;

use ns_core::{AssetRecord, NarrativeError, NsValue};
use regex::Regex;
use rhai::{Array, Dynamic, Engine, EvalAltResult, ImmutableString};

use crate::helpers::builtins::register_builtins;
use crate::helpers::rhai_bridge::{
    dynamic_to_value, helper_symbol, runtime_error, string_literal, value_to_dynamic,
    LOOKUP_SYMBOL,
};
use crate::helpers::value_path::{parse_ref_path, read_nested_path};
use crate::state::GameStateManager;

pub type HelperResult = Result<Option<NsValue>, String>;
pub type HelperFn = Rc<dyn Fn(&RenderContext, &[Option<NsValue>]) -> HelperResult>;

/// What templates can see: a copy of the game state plus the host's asset list.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    pub state: GameStateManager,
    pub assets: Vec<AssetRecord>,
}

impl RenderContext {
    pub fn new(state: GameStateManager, assets: Vec<AssetRecord>) -> Self {
        Self { state, assets }
    }

    /// Resolves a variable path. A flat key wins over a nested read so that
    /// variables stored under dotted names stay reachable.
    pub fn lookup(&self, path: &str) -> Option<NsValue> {
        if let Some(value) = self.state.get_variable(path) {
            return Some(value);
        }
        let segments = parse_ref_path(path);
        let (root, nested) = segments.split_first()?;
        let root_value = self.state.get_variable(root)?;
        read_nested_path(&root_value, nested).cloned()
    }
}

#[derive(Clone, Default)]
pub struct HelperRegistry {
    helpers: BTreeMap<String, HelperFn>,
}

impl fmt::Debug for HelperRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelperRegistry")
            .field("helpers", &self.helpers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl HelperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        register_builtins(&mut registry);
        registry
    }

    /// Registers or replaces a helper.
    pub fn register<F>(&mut self, name: &str, helper: F)
    where
        F: Fn(&RenderContext, &[Option<NsValue>]) -> HelperResult + 'static,
    {
        self.helpers.insert(name.to_string(), Rc::new(helper));
    }

    /// Copies every helper of `other` into this registry, replacing same-named ones.
    pub fn extend_from(&mut self, other: &HelperRegistry) {
        for (name, helper) in &other.helpers {
            self.helpers.insert(name.clone(), Rc::clone(helper));
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.helpers.keys().cloned().collect()
    }

    pub fn call(
        &self,
        name: &str,
        context: &RenderContext,
        args: &[Option<NsValue>],
    ) -> HelperResult {
        let helper = self
            .helpers
            .get(name)
            .ok_or_else(|| format!("Missing helper \"{}\".", name))?;
        helper(context, args)
    }
}

fn template_regex() -> &'static Regex {
    static TEMPLATE: OnceLock<Regex> = OnceLock::new();
    TEMPLATE.get_or_init(|| {
        Regex::new(r"\{\{\{?([^{}]*?)\}?\}\}").expect("template regex must compile")
    })
}

/// Evaluates `{{ ... }}` templates and condition expressions over a render
/// context that the owner refreshes before each use.
pub struct TemplateBridge {
    engine: Engine,
    registry: HelperRegistry,
    context: Rc<RefCell<RenderContext>>,
}

impl fmt::Debug for TemplateBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateBridge")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl TemplateBridge {
    pub fn new(registry: HelperRegistry) -> Self {
        let context = Rc::new(RefCell::new(RenderContext::default()));
        let mut engine = Engine::new();
        engine.set_strict_variables(true);

        let lookup_context = Rc::clone(&context);
        engine.register_fn(LOOKUP_SYMBOL, move |path: ImmutableString| -> Dynamic {
            let value = lookup_context.borrow().lookup(path.as_str());
            value_to_dynamic(value.as_ref())
        });

        for (name, helper) in &registry.helpers {
            let helper = Rc::clone(helper);
            let helper_context = Rc::clone(&context);
            let helper_name = name.clone();
            engine.register_fn(
                helper_symbol(name),
                move |args: Array| -> Result<Dynamic, Box<EvalAltResult>> {
                    let mut values = Vec::with_capacity(args.len());
                    for arg in args {
                        values.push(dynamic_to_value(arg).map_err(runtime_error)?);
                    }
                    let result = helper(&helper_context.borrow(), &values).map_err(|message| {
                        runtime_error(format!("{}: {}", helper_name, message))
                    })?;
                    Ok(value_to_dynamic(result.as_ref()))
                },
            );
        }

        Self {
            engine,
            registry,
            context,
        }
    }

    pub fn registry(&self) -> &HelperRegistry {
        &self.registry
    }

    pub fn set_context(&self, context: RenderContext) {
        *self.context.borrow_mut() = context;
    }

    pub fn set_state(&self, state: GameStateManager) {
        self.context.borrow_mut().state = state;
    }

    pub fn set_assets(&self, assets: Vec<AssetRecord>) {
        self.context.borrow_mut().assets = assets;
    }

    pub fn context(&self) -> RenderContext {
        self.context.borrow().clone()
    }

    /// Replaces every `{{expr}}` (or `{{{expr}}}`) with the rendered value.
    /// Absent values render as an empty string; output is not escaped.
    pub fn render(&self, template: &str) -> Result<String, NarrativeError> {
        if !template.contains("{{") {
            return Ok(template.to_string());
        }

        let mut output = String::with_capacity(template.len());
        let mut last_index = 0usize;
        for captures in template_regex().captures_iter(template) {
            let (Some(full), Some(expr)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            output.push_str(&template[last_index..full.start()]);
            let value = self
                .eval(expr.as_str())
                .map_err(|message| NarrativeError::template(template, message))?;
            if let Some(value) = value {
                output.push_str(&value.to_text());
            }
            last_index = full.end();
        }
        output.push_str(&template[last_index..]);
        Ok(output)
    }

    pub fn evaluate(&self, expression: &str) -> Result<Option<NsValue>, NarrativeError> {
        self.eval(strip_braces(expression))
            .map_err(|message| NarrativeError::template(expression, message))
    }

    pub fn evaluate_condition(&self, expression: &str) -> Result<bool, NarrativeError> {
        Ok(self
            .evaluate(expression)?
            .is_some_and(|value| value.is_truthy()))
    }

    fn eval(&self, expression: &str) -> Result<Option<NsValue>, String> {
        let script = rewrite_expression(expression, &self.registry)?;
        let result = self
            .engine
            .eval::<Dynamic>(&format!("({})", script))
            .map_err(|error| describe_eval_error(&error))?;
        dynamic_to_value(result)
    }
}

fn strip_braces(expression: &str) -> &str {
    let trimmed = expression.trim();
    trimmed
        .strip_prefix("{{")
        .and_then(|inner| inner.strip_suffix("}}"))
        .unwrap_or(trimmed)
}

fn describe_eval_error(error: &EvalAltResult) -> String {
    match error {
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => describe_eval_error(inner),
        EvalAltResult::ErrorRuntime(value, _) => value.to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open,
    Close,
    Text(String),
    Word(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(String),
    Path(String),
    Call { name: String, args: Vec<Expr> },
}

fn tokenize(expression: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = expression.chars().peekable();
    while let Some(&ch) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '"' | '\'' => {
                chars.next();
                let mut text = String::new();
                let mut closed = false;
                while let Some(next) = chars.next() {
                    match next {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                text.push(escaped);
                            }
                        }
                        quote if quote == ch => {
                            closed = true;
                            break;
                        }
                        other => text.push(other),
                    }
                }
                if !closed {
                    return Err(format!("Unterminated string literal in \"{}\".", expression));
                }
                tokens.push(Token::Text(text));
            }
            _ => {
                let mut word = String::new();
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() || matches!(next, '(' | ')' | '"' | '\'') {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
        }
    }
    Ok(tokens)
}

fn parse_group(
    tokens: &[Token],
    pos: &mut usize,
    nested: bool,
    registry: &HelperRegistry,
) -> Result<Expr, String> {
    let mut items = Vec::new();
    loop {
        let Some(token) = tokens.get(*pos) else {
            if nested {
                return Err("Missing closing parenthesis.".to_string());
            }
            break;
        };
        *pos += 1;
        match token {
            Token::Close if nested => break,
            Token::Close => return Err("Unexpected closing parenthesis.".to_string()),
            Token::Open => items.push(parse_group(tokens, pos, true, registry)?),
            Token::Text(text) => items.push(Expr::Literal(string_literal(text))),
            Token::Word(word) => items.push(word_expr(word)),
        }
    }

    let mut items = items.into_iter();
    let Some(head) = items.next() else {
        return Err("Empty expression.".to_string());
    };
    let args = items.collect::<Vec<_>>();

    match head {
        Expr::Path(name) if registry.contains(&name) => Ok(Expr::Call { name, args }),
        Expr::Path(name) if !args.is_empty() => Err(format!("Missing helper \"{}\".", name)),
        head if args.is_empty() => Ok(head),
        _ => Err("Only a helper name can take arguments.".to_string()),
    }
}

fn word_expr(word: &str) -> Expr {
    match word {
        "true" | "false" => Expr::Literal(word.to_string()),
        "null" | "undefined" => Expr::Literal("()".to_string()),
        _ => match word.parse::<f64>() {
            Ok(number) if number.is_finite() => Expr::Literal(format!("{:?}", number)),
            _ => Expr::Path(word.to_string()),
        },
    }
}

fn emit(expr: &Expr) -> String {
    match expr {
        Expr::Literal(literal) => literal.clone(),
        Expr::Path(path) => format!("{}({})", LOOKUP_SYMBOL, string_literal(path)),
        Expr::Call { name, args } => format!(
            "{}([{}])",
            helper_symbol(name),
            args.iter().map(emit).collect::<Vec<_>>().join(", ")
        ),
    }
}

/// Rewrites helper-call syntax (`gt (length items) 1`) into a Rhai call
/// expression over the registered helper symbols.
fn rewrite_expression(expression: &str, registry: &HelperRegistry) -> Result<String, String> {
    let tokens = tokenize(expression)?;
    let mut pos = 0usize;
    let expr = parse_group(&tokens, &mut pos, false, registry)?;
    Ok(emit(&expr))
}
