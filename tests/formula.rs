//! Tests for the formula language: parsing, evaluation and built-ins.
use serde_json::json;
use yoshiki::error::{EvalError, ParseError};
use yoshiki::formula::{self, CompiledFormula, Expression, FormulaScope, FunctionRegistry};
use yoshiki::path::RepeaterContext;
use yoshiki::value::Value;

fn eval(source: &str) -> Result<Value, EvalError> {
    let entity = json!({
        "name": "Mira",
        "class": "rogue",
        "level": 5,
        "attributes": { "strength": 15, "dexterity": 7 },
        "inventory": [
            { "name": "Rope", "weight": 10 },
            { "name": "Lantern", "weight": 2 },
            { "name": "Lockpicks", "weight": 1 }
        ],
        "notes": null,
        "bonus": "2",
        "rolls": [4, 17, 9]
    });
    formula::evaluate(source, &entity, None)
}

#[cfg(test)]
mod parser_tests {
    use super::*;

    #[test]
    fn test_precedence_and_display() {
        let cases = [
            ("1 + 2 * 3", "1 + 2 * 3"),
            ("(1 + 2) * 3", "(1 + 2) * 3"),
            ("1 - (2 - 3)", "1 - (2 - 3)"),
            ("!(@a && @b) || @c", "!(@a && @b) || @c"),
            ("@a > 1 ? 'yes' : \"no\"", "@a > 1 ? \"yes\" : \"no\""),
            ("Math.floor(@x / 2)", "floor(@x / 2)"),
        ];
        for (source, canonical) in cases {
            let expr = formula::parse(source).unwrap();
            assert_eq!(expr.to_string(), canonical, "source: {}", source);
            // The canonical form parses back to the same tree.
            assert_eq!(formula::parse(canonical).unwrap(), expr);
        }
    }

    #[test]
    fn test_strict_equality_is_accepted() {
        assert_eq!(
            formula::parse("@a === 1").unwrap(),
            formula::parse("@a == 1").unwrap()
        );
        assert_eq!(
            formula::parse("@a !== 1").unwrap(),
            formula::parse("@a != 1").unwrap()
        );
    }

    #[test]
    fn test_reduce_is_a_special_form() {
        let expr = formula::parse("reduce(@items, 0, acc + item.weight)").unwrap();
        assert!(matches!(expr, Expression::Reduce { .. }));

        let err = formula::parse("reduce(@items, 0)").unwrap_err();
        assert!(matches!(err, ParseError::InvalidSyntax { .. }));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(
            formula::parse("1 +"),
            Err(ParseError::UnexpectedEof { .. })
        ));
        assert!(matches!(
            formula::parse("(1 + 2"),
            Err(ParseError::UnexpectedEof { .. })
        ));
        assert!(matches!(
            formula::parse("1 2"),
            Err(ParseError::UnexpectedToken { pos: 2, .. })
        ));
        assert!(matches!(
            formula::parse("1 # 2"),
            Err(ParseError::LexerError { pos: 2 })
        ));
        assert!(matches!(
            formula::parse("a.b.c(1)"),
            Err(ParseError::InvalidSyntax { .. })
        ));
    }

    #[test]
    fn test_nesting_is_bounded() {
        let nested = |depth: usize| format!("{}1{}", "(".repeat(depth), ")".repeat(depth));

        assert_eq!(eval(&nested(100)).unwrap(), Value::Number(1.0));
        for source in [
            nested(2_000),
            format!("{}true", "!".repeat(2_000)),
            vec!["1"; 2_000].join(" + "),
        ] {
            match formula::parse(&source) {
                Err(ParseError::InvalidSyntax { message, .. }) => {
                    assert_eq!(message, "formula nested too deeply")
                }
                other => panic!("expected a nesting error, got {:?}", other.map(|_| ())),
            }
            assert!(matches!(eval(&source), Err(EvalError::Parse(_))));
        }
        // Long flat chains below the limit still parse.
        assert_eq!(
            eval(&vec!["1"; 200].join(" + ")).unwrap(),
            Value::Number(200.0)
        );
    }

    #[test]
    fn test_references_in_order_of_appearance() {
        let expr =
            formula::parse("@a.b + max(@computed.x, @items[{{index}}].w) + @a.b").unwrap();
        assert_eq!(
            expr.references(),
            vec!["a.b", "computed.x", "items[{{index}}].w"]
        );

        let compiled =
            CompiledFormula::compile("@a.b + max(@computed.x, @items[{{index}}].w) + @a.b");
        assert_eq!(compiled.dependencies(), vec!["a.b", "computed.x", "items"]);
    }

    #[test]
    fn test_broken_formula_is_kept() {
        let compiled = CompiledFormula::compile("floor(");
        assert!(compiled.expression().is_err());
        assert!(compiled.dependencies().is_empty());

        let entity = json!({});
        let functions = FunctionRegistry::with_builtins();
        let result = compiled.evaluate(FormulaScope::new(&entity, &functions));
        assert!(matches!(result, Err(EvalError::Parse(_))));
    }
}

#[cfg(test)]
mod evaluator_tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), Value::Number(7.0));
        assert_eq!(eval("(1 + 2) * 3").unwrap(), Value::Number(9.0));
        assert_eq!(eval("7 % 4").unwrap(), Value::Number(3.0));
        assert_eq!(eval("-@level + 1").unwrap(), Value::Number(-4.0));
        assert_eq!(eval("@level * @bonus").unwrap(), Value::Number(10.0));
    }

    #[test]
    fn test_ability_modifiers() {
        assert_eq!(
            eval("floor((@attributes.strength - 10) / 2)").unwrap(),
            Value::Number(2.0)
        );
        assert_eq!(
            eval("Math.floor((@attributes.dexterity - 10) / 2)").unwrap(),
            Value::Number(-2.0)
        );
    }

    #[test]
    fn test_rounding_halves_up() {
        assert_eq!(eval("round(2.5)").unwrap(), Value::Number(3.0));
        assert_eq!(eval("round(-2.5)").unwrap(), Value::Number(-2.0));
        assert_eq!(eval("Math.round(2.4)").unwrap(), Value::Number(2.0));
        // The largest double below one half must not round up.
        assert_eq!(eval("round(0.49999999999999994)").unwrap(), Value::Number(0.0));
        assert_eq!(eval("round(-0.5)").unwrap(), Value::Number(0.0));
        assert_eq!(eval("ceil(1.1) + trunc(-1.7)").unwrap(), Value::Number(1.0));
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(
            eval("\"Level \" + @level").unwrap(),
            Value::String("Level 5".to_string())
        );
        assert_eq!(
            eval("`${@name} the ${@class}, level ${@level + 1}`").unwrap(),
            Value::String("Mira the rogue, level 6".to_string())
        );
        assert_eq!(
            eval("concat(@name, \"-\", @level, @missing)").unwrap(),
            Value::String("Mira-5".to_string())
        );
    }

    #[test]
    fn test_comparisons_and_ternary() {
        assert_eq!(
            eval("@level >= 5 ? 'veteran' : 'novice'").unwrap(),
            Value::String("veteran".to_string())
        );
        assert_eq!(eval("@class == 'rogue'").unwrap(), Value::Bool(true));
        assert_eq!(eval("@class === 'wizard'").unwrap(), Value::Bool(false));
        assert_eq!(eval("'apple' < 'banana'").unwrap(), Value::Bool(true));
        assert_eq!(eval("@bonus < 10").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_logical_operators_return_deciding_operand() {
        assert_eq!(eval("@missing || 10").unwrap(), Value::Number(10.0));
        assert_eq!(eval("0 && 5").unwrap(), Value::Number(0.0));
        assert_eq!(eval("@name && @level").unwrap(), Value::Number(5.0));
        assert_eq!(eval("!@notes").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_missing_data_is_undefined_not_null() {
        assert_eq!(eval("@missing").unwrap(), Value::Undefined);
        assert_eq!(eval("@notes").unwrap(), Value::Null);
        assert_eq!(eval("@notes == null").unwrap(), Value::Bool(true));
        assert_eq!(eval("@missing == null").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_evaluation_errors() {
        assert_eq!(eval("10 / 0"), Err(EvalError::DivisionByZero));
        assert_eq!(eval("10 % 0"), Err(EvalError::DivisionByZero));
        assert!(matches!(
            eval("@missing + 1"),
            Err(EvalError::UndefinedOperand { .. })
        ));
        assert!(matches!(
            eval("@missing > 1"),
            Err(EvalError::UndefinedOperand { .. })
        ));
        assert!(matches!(
            eval("@name * 2"),
            Err(EvalError::TypeMismatch { .. })
        ));
        assert_eq!(
            eval("frobnicate(1)"),
            Err(EvalError::UnknownFunction("frobnicate".to_string()))
        );
        assert!(matches!(
            eval("floor(1, 2)"),
            Err(EvalError::Arity { found: 2, .. })
        ));
        assert_eq!(
            eval("item.weight"),
            Err(EvalError::UnknownVariable("item".to_string()))
        );
    }

    #[test]
    fn test_object_values_convert_back_to_entity_json() {
        assert_eq!(
            eval("@attributes").unwrap().to_json(),
            Some(json!({ "strength": 15, "dexterity": 7 }))
        );
    }

    #[test]
    fn test_reduce_over_inventory() {
        assert_eq!(
            eval("reduce(@inventory, 0, acc + item.weight)").unwrap(),
            Value::Number(13.0)
        );
        assert_eq!(
            eval("reduce(@inventory, '', acc + index)").unwrap(),
            Value::String("012".to_string())
        );
        assert_eq!(
            eval("reduce(@missing, 42, acc + 1)").unwrap(),
            Value::Number(42.0)
        );
        assert!(matches!(
            eval("reduce(@name, 0, acc)"),
            Err(EvalError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_aggregate_functions() {
        assert_eq!(eval("sum(@inventory, 'weight')").unwrap(), Value::Number(13.0));
        assert_eq!(eval("sum(@missing)").unwrap(), Value::Number(0.0));
        assert_eq!(eval("count(@inventory)").unwrap(), Value::Number(3.0));
        assert_eq!(eval("count(@name)").unwrap(), Value::Number(4.0));
        assert_eq!(eval("min(@rolls)").unwrap(), Value::Number(4.0));
        assert_eq!(eval("max(@rolls, 20)").unwrap(), Value::Number(20.0));
        assert_eq!(eval("max(@level, 3, 9)").unwrap(), Value::Number(9.0));
        assert_eq!(eval("clamp(15, 0, 10)").unwrap(), Value::Number(10.0));
        assert!(matches!(eval("max()"), Err(EvalError::Arity { .. })));
    }

    #[test]
    fn test_repeater_context_reference() {
        let entity = json!({ "items": [{ "weight": 4 }, { "weight": 6 }] });
        let item = json!({ "weight": 6 });
        let context = RepeaterContext::root(1, &item);

        let value = formula::evaluate("@items[{{index}}].weight * 2", &entity, Some(&context));
        assert_eq!(value.unwrap(), Value::Number(12.0));

        let outside = formula::evaluate("@items[{{index}}].weight", &entity, None);
        assert!(matches!(outside, Err(EvalError::Path(_))));
    }
}
