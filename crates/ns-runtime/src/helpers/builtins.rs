use std::cmp::Ordering;

use ns_core::NsValue;

use crate::assets::{asset_source, find_asset};
use crate::template::{HelperRegistry, HelperResult, RenderContext};

pub(crate) fn register_builtins(registry: &mut HelperRegistry) {
    registry.register("add", |_, args| arithmetic("add", args, |a, b| Ok(a + b)));
    registry.register("subtract", |_, args| {
        arithmetic("subtract", args, |a, b| Ok(a - b))
    });
    registry.register("multiply", |_, args| {
        arithmetic("multiply", args, |a, b| Ok(a * b))
    });
    registry.register("divide", |_, args| {
        arithmetic("divide", args, |a, b| {
            if b == 0.0 {
                Err("Division by zero.".to_string())
            } else {
                Ok(a / b)
            }
        })
    });

    registry.register("eq", |_, args| Ok(Some(NsValue::Bool(arg(args, 0) == arg(args, 1)))));
    registry.register("neq", |_, args| Ok(Some(NsValue::Bool(arg(args, 0) != arg(args, 1)))));
    registry.register("gt", |_, args| compare(args, Ordering::is_gt));
    registry.register("lt", |_, args| compare(args, Ordering::is_lt));
    registry.register("gte", |_, args| compare(args, Ordering::is_ge));
    registry.register("lte", |_, args| compare(args, Ordering::is_le));

    registry.register("and", |_, args| {
        Ok(Some(NsValue::Bool(
            !args.is_empty() && args.iter().all(|value| truthy(value.as_ref())),
        )))
    });
    registry.register("or", |_, args| {
        Ok(Some(NsValue::Bool(
            args.iter().any(|value| truthy(value.as_ref())),
        )))
    });
    registry.register("not", |_, args| Ok(Some(NsValue::Bool(!truthy(arg(args, 0))))));

    registry.register("length", |_, args| {
        let length = match arg(args, 0) {
            Some(NsValue::String(value)) => value.chars().count(),
            Some(NsValue::Array(values)) => values.len(),
            Some(NsValue::Map(entries)) => entries.len(),
            _ => 0,
        };
        Ok(Some(NsValue::Number(length as f64)))
    });
    registry.register("first", |_, args| {
        Ok(arg(args, 0)
            .and_then(NsValue::as_array)
            .and_then(<[NsValue]>::first)
            .cloned())
    });
    registry.register("last", |_, args| {
        Ok(arg(args, 0)
            .and_then(NsValue::as_array)
            .and_then(<[NsValue]>::last)
            .cloned())
    });

    registry.register("hasFlag", |context, args| {
        let flag = text_arg(args, 0);
        Ok(Some(NsValue::Bool(context.state.has_story_flag(&flag))))
    });
    registry.register("getVar", |context, args| {
        let key = text_arg(args, 0);
        Ok(context
            .lookup(&key)
            .or_else(|| args.get(1).cloned().flatten()))
    });
    registry.register("playerChose", |context, args| {
        let text = text_arg(args, 0);
        let scene = arg(args, 1).map(NsValue::to_text);
        Ok(Some(NsValue::Bool(
            context.state.player_chose(&text, scene.as_deref()),
        )))
    });
    registry.register("currentTime", |context, _| {
        Ok(Some(NsValue::Number(context.state.get_current_time())))
    });
    registry.register("getList", |context, args| {
        let name = text_arg(args, 0);
        Ok(Some(NsValue::Array(context.state.get_list(&name))))
    });

    registry.register("concat", |_, args| {
        let joined = args
            .iter()
            .map(|value| value.as_ref().map(NsValue::to_text).unwrap_or_default())
            .collect::<String>();
        Ok(Some(NsValue::String(joined)))
    });
    registry.register("uppercase", |_, args| {
        Ok(Some(NsValue::String(text_arg(args, 0).to_uppercase())))
    });
    registry.register("lowercase", |_, args| {
        Ok(Some(NsValue::String(text_arg(args, 0).to_lowercase())))
    });

    registry.register("asset", |context, args| {
        let key = text_arg(args, 0);
        Ok(find_asset(&context.assets, &key)
            .and_then(asset_source)
            .map(|source| NsValue::String(source.to_string())))
    });
    registry.register("hasAsset", |context, args| {
        let key = text_arg(args, 0);
        Ok(Some(NsValue::Bool(
            find_asset(&context.assets, &key).is_some(),
        )))
    });
}

fn arg(args: &[Option<NsValue>], index: usize) -> Option<&NsValue> {
    args.get(index).and_then(Option::as_ref)
}

fn text_arg(args: &[Option<NsValue>], index: usize) -> String {
    arg(args, index).map(NsValue::to_text).unwrap_or_default()
}

fn truthy(value: Option<&NsValue>) -> bool {
    value.is_some_and(NsValue::is_truthy)
}

fn coerce_number(value: &NsValue) -> Option<f64> {
    match value {
        NsValue::Number(value) => Some(*value),
        NsValue::Bool(value) => Some(if *value { 1.0 } else { 0.0 }),
        NsValue::String(value) => value.trim().parse::<f64>().ok(),
        NsValue::Array(_) | NsValue::Map(_) => None,
    }
}

fn arithmetic(
    name: &str,
    args: &[Option<NsValue>],
    op: fn(f64, f64) -> Result<f64, String>,
) -> HelperResult {
    let numbers = args
        .iter()
        .map(|value| {
            value.as_ref().and_then(coerce_number).ok_or_else(|| {
                format!(
                    "Helper \"{}\" expects numeric arguments, got {}.",
                    name,
                    value.as_ref().map(NsValue::type_name).unwrap_or("undefined")
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let Some((first, rest)) = numbers.split_first().filter(|(_, rest)| !rest.is_empty()) else {
        return Err(format!(
            "Helper \"{}\" expects at least two arguments.",
            name
        ));
    };

    let mut total = *first;
    for value in rest {
        total = op(total, *value)?;
    }
    Ok(Some(NsValue::Number(total)))
}

fn compare(args: &[Option<NsValue>], test: fn(Ordering) -> bool) -> HelperResult {
    let (Some(left), Some(right)) = (arg(args, 0), arg(args, 1)) else {
        return Ok(Some(NsValue::Bool(false)));
    };
    let ordering = match (left, right) {
        (NsValue::String(left), NsValue::String(right)) => Some(left.cmp(right)),
        _ => match (coerce_number(left), coerce_number(right)) {
            (Some(left), Some(right)) => left.partial_cmp(&right),
            _ => None,
        },
    };
    Ok(Some(NsValue::Bool(ordering.is_some_and(test))))
}
