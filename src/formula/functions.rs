use crate::error::EvalError;
use crate::value::Value;
use ahash::AHashMap;
use std::fmt;
use std::sync::Arc;

/// Defines the contract for a function callable from formulas.
///
/// `reduce` is not a function: its body is evaluated once per item, so the
/// evaluator handles it as a special form.
pub trait FormulaFunction: Send + Sync {
    fn name(&self) -> &str;
    fn call(&self, args: &[Value]) -> Result<Value, EvalError>;
}

/// The set of functions available to a form's formulas.
#[derive(Clone)]
pub struct FunctionRegistry {
    functions: AHashMap<String, Arc<dyn FormulaFunction>>,
}

impl FunctionRegistry {
    /// A registry holding only the built-in functions.
    pub fn with_builtins() -> Self {
        let mut functions = AHashMap::new();
        register_builtin_functions(&mut functions);
        Self { functions }
    }

    /// Adds or replaces a function under its own name.
    pub fn register(&mut self, function: Box<dyn FormulaFunction>) {
        self.functions
            .insert(function.name().to_string(), Arc::from(function));
    }

    /// Makes `alias` call the built-in `builtin`. Returns false if no such
    /// built-in exists.
    pub fn alias(&mut self, alias: &str, builtin: &str) -> bool {
        match create_function_by_name(builtin) {
            Some(function) => {
                self.functions.insert(alias.to_string(), function);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn FormulaFunction> {
        self.functions.get(name).map(|function| function.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, EvalError> {
        self.get(name)
            .ok_or_else(|| EvalError::UnknownFunction(name.to_string()))?
            .call(args)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("FunctionRegistry")
            .field("functions", &names)
            .finish()
    }
}

/// Helper to check the argument count of a call.
fn require_args(args: &[Value], min: usize, max: usize, name: &str) -> Result<(), EvalError> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else if max == usize::MAX {
            format!("at least {}", min)
        } else {
            format!("{} to {}", min, max)
        };
        return Err(EvalError::Arity {
            name: name.to_string(),
            expected,
            found: args.len(),
        });
    }
    Ok(())
}

fn number_arg(value: &Value, name: &str) -> Result<f64, EvalError> {
    match value {
        Value::Undefined | Value::Null => Err(EvalError::UndefinedOperand {
            operation: name.to_string(),
        }),
        other => other
            .as_arithmetic_number()
            .ok_or_else(|| EvalError::type_mismatch(name, "number", other.clone())),
    }
}

/// Array arguments are flattened into the argument list.
fn flatten_numbers(args: &[Value], name: &str) -> Result<Vec<f64>, EvalError> {
    let mut numbers = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            Value::Array(items) => {
                for item in items {
                    numbers.push(number_arg(item, name)?);
                }
            }
            other => numbers.push(number_arg(other, name)?),
        }
    }
    Ok(numbers)
}

/// JavaScript rounding: halves round towards positive infinity.
fn round_half_up(n: f64) -> f64 {
    let rounded = n.round();
    if (rounded - n).abs() == 0.5 {
        n.ceil()
    } else {
        rounded
    }
}

/// Master macro to define the single-argument numeric functions, their
/// registration, and their creation by name.
macro_rules! define_numeric_functions {
    ( $( ($struct_name:ident, $name:literal, $op:expr) ),* $(,)? ) => {
        $(
            struct $struct_name;
            impl FormulaFunction for $struct_name {
                fn name(&self) -> &str { $name }
                fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
                    require_args(args, 1, 1, $name)?;
                    let n = number_arg(&args[0], $name)?;
                    Ok(Value::Number(($op)(n)))
                }
            }
        )*

        fn register_numeric_functions(registry: &mut AHashMap<String, Arc<dyn FormulaFunction>>) {
            $( registry.insert($name.to_string(), Arc::new($struct_name)); )*
        }

        fn create_numeric_function(name: &str) -> Option<Arc<dyn FormulaFunction>> {
            match name {
                $( $name => Some(Arc::new($struct_name)), )*
                _ => None,
            }
        }
    };
}

define_numeric_functions! {
    (FloorFunction, "floor", f64::floor),
    (CeilFunction, "ceil", f64::ceil),
    (RoundFunction, "round", round_half_up),
    (AbsFunction, "abs", f64::abs),
    (TruncFunction, "trunc", f64::trunc),
    (SqrtFunction, "sqrt", f64::sqrt),
}

struct MinFunction;
impl FormulaFunction for MinFunction {
    fn name(&self) -> &str {
        "min"
    }
    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        require_args(args, 1, usize::MAX, "min")?;
        let numbers = flatten_numbers(args, "min")?;
        Ok(numbers
            .into_iter()
            .reduce(f64::min)
            .map(Value::Number)
            .unwrap_or_default())
    }
}

struct MaxFunction;
impl FormulaFunction for MaxFunction {
    fn name(&self) -> &str {
        "max"
    }
    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        require_args(args, 1, usize::MAX, "max")?;
        let numbers = flatten_numbers(args, "max")?;
        Ok(numbers
            .into_iter()
            .reduce(f64::max)
            .map(Value::Number)
            .unwrap_or_default())
    }
}

struct ClampFunction;
impl FormulaFunction for ClampFunction {
    fn name(&self) -> &str {
        "clamp"
    }
    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        require_args(args, 3, 3, "clamp")?;
        let value = number_arg(&args[0], "clamp")?;
        let low = number_arg(&args[1], "clamp")?;
        let high = number_arg(&args[2], "clamp")?;
        Ok(Value::Number(value.max(low).min(high)))
    }
}

/// `sum(array)` or `sum(array, "key")`. Missing items or keys count as zero.
struct SumFunction;
impl FormulaFunction for SumFunction {
    fn name(&self) -> &str {
        "sum"
    }
    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        require_args(args, 1, 2, "sum")?;
        let key = match args.get(1) {
            None => None,
            Some(Value::String(key)) => Some(key.as_str()),
            Some(other) => return Err(EvalError::type_mismatch("sum", "string key", other.clone())),
        };
        let items = match &args[0] {
            Value::Undefined | Value::Null => return Ok(Value::Number(0.0)),
            Value::Array(items) => items,
            other => return Err(EvalError::type_mismatch("sum", "array", other.clone())),
        };

        let mut total = 0.0;
        for item in items {
            let value = match key {
                Some(key) => item.member(key),
                None => item.clone(),
            };
            if !matches!(value, Value::Undefined | Value::Null) {
                total += number_arg(&value, "sum")?;
            }
        }
        Ok(Value::Number(total))
    }
}

/// Length of an array or string; absent data counts as zero.
struct CountFunction;
impl FormulaFunction for CountFunction {
    fn name(&self) -> &str {
        "count"
    }
    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        require_args(args, 1, 1, "count")?;
        let len = match &args[0] {
            Value::Undefined | Value::Null => 0,
            Value::Array(items) => items.len(),
            Value::String(s) => s.chars().count(),
            Value::Object(map) => map.len(),
            other => return Err(EvalError::type_mismatch("count", "array", other.clone())),
        };
        Ok(Value::Number(len as f64))
    }
}

struct ConcatFunction;
impl FormulaFunction for ConcatFunction {
    fn name(&self) -> &str {
        "concat"
    }
    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        Ok(Value::String(
            args.iter().map(Value::display_text).collect::<String>(),
        ))
    }
}

fn register_builtin_functions(registry: &mut AHashMap<String, Arc<dyn FormulaFunction>>) {
    register_numeric_functions(registry);
    for function in [
        Arc::new(MinFunction) as Arc<dyn FormulaFunction>,
        Arc::new(MaxFunction),
        Arc::new(ClampFunction),
        Arc::new(SumFunction),
        Arc::new(CountFunction),
        Arc::new(ConcatFunction),
    ] {
        registry.insert(function.name().to_string(), function);
    }
}

fn create_function_by_name(name: &str) -> Option<Arc<dyn FormulaFunction>> {
    create_numeric_function(name).or_else(|| match name {
        "min" => Some(Arc::new(MinFunction)),
        "max" => Some(Arc::new(MaxFunction)),
        "clamp" => Some(Arc::new(ClampFunction)),
        "sum" => Some(Arc::new(SumFunction)),
        "count" => Some(Arc::new(CountFunction)),
        "concat" => Some(Arc::new(ConcatFunction)),
        _ => None,
    })
}
