use serde_json::{Map, Value};

use ns_core::{ChoiceOption, NarrativeError, ParsedScene, ScriptInstruction, SourceLocation};

use crate::document::load_document;

const DIALOGUE_KEYS: [&str; 5] = ["say", "text", "speaker", "choices", "choice"];

/// Loads and parses one script file.
pub fn parse_script(source: &str, file_name: &str) -> Result<Vec<ParsedScene>, NarrativeError> {
    let document = load_document(source, file_name)?;
    parse_scenes(&document, file_name)
}

/// Parses a document of the shape `scene name -> [instruction, ...]`.
pub fn parse_scenes(document: &Value, file_name: &str) -> Result<Vec<ParsedScene>, NarrativeError> {
    let Some(entries) = document.as_object() else {
        return Err(NarrativeError::parse(
            "Script document must be a mapping from scene name to instruction list",
            SourceLocation::new(file_name, 0, ""),
        ));
    };

    let mut scenes = Vec::with_capacity(entries.len());
    for (scene_name, body) in entries {
        let Some(items) = body.as_array() else {
            return Err(NarrativeError::parse(
                format!("Scene \"{}\" must be a list of instructions", scene_name),
                SourceLocation::new(file_name, 0, scene_name.as_str()),
            ));
        };

        let mut instructions = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let location = SourceLocation::new(file_name, index + 1, scene_name.as_str());
            instructions.push(parse_instruction(item, &location)?);
        }

        scenes.push(ParsedScene {
            name: scene_name.clone(),
            instructions,
        });
    }

    Ok(scenes)
}

/// Appends `incoming` to `scenes`, rejecting a scene name that is already defined.
pub fn merge_scenes(
    scenes: &mut Vec<ParsedScene>,
    incoming: Vec<ParsedScene>,
    file_name: &str,
) -> Result<(), NarrativeError> {
    for scene in incoming {
        if scenes.iter().any(|existing| existing.name == scene.name) {
            return Err(NarrativeError::parse(
                format!("Scene \"{}\" is defined more than once", scene.name),
                SourceLocation::new(file_name, 0, scene.name.as_str()),
            ));
        }
        scenes.push(scene);
    }
    Ok(())
}

pub fn parse_instruction(
    item: &Value,
    location: &SourceLocation,
) -> Result<ScriptInstruction, NarrativeError> {
    if let Value::String(text) = item {
        return Ok(ScriptInstruction::Dialogue {
            speaker: None,
            text: text.clone(),
            actions: Vec::new(),
            choices: None,
            location: location.clone(),
        });
    }

    let Some(object) = item.as_object() else {
        return Err(invalid_format(location));
    };

    if let Some(actions) = object.get("actions").or_else(|| object.get("action")) {
        return Ok(ScriptInstruction::Action {
            actions: normalize_list(actions),
            location: location.clone(),
        });
    }

    if let Some(condition) = object.get("if") {
        return parse_conditional(object, condition, location);
    }

    if let Some(target) = object.get("goto").or_else(|| object.get("jump")) {
        let Some(target) = scalar_text(target) else {
            return Err(NarrativeError::parse(
                "Jump target must be a scene name",
                location.clone(),
            ));
        };
        return Ok(ScriptInstruction::Jump {
            target,
            location: location.clone(),
        });
    }

    if DIALOGUE_KEYS.iter().any(|key| object.contains_key(*key)) {
        return parse_dialogue(object, location);
    }

    Err(invalid_format(location))
}

fn parse_conditional(
    object: &Map<String, Value>,
    condition: &Value,
    location: &SourceLocation,
) -> Result<ScriptInstruction, NarrativeError> {
    let Some(condition) = scalar_text(condition) else {
        return Err(NarrativeError::parse(
            "Conditional \"if\" must be an expression string",
            location.clone(),
        ));
    };

    let then_branch = match object.get("then") {
        Some(branch) => parse_sequence(branch, location)?,
        None => Vec::new(),
    };
    let else_branch = match object.get("else") {
        Some(branch) => Some(parse_sequence(branch, location)?),
        None => None,
    };

    Ok(ScriptInstruction::Conditional {
        condition,
        then_branch,
        else_branch,
        location: location.clone(),
    })
}

fn parse_sequence(
    branch: &Value,
    location: &SourceLocation,
) -> Result<Vec<ScriptInstruction>, NarrativeError> {
    normalize_list(branch)
        .iter()
        .map(|item| parse_instruction(item, location))
        .collect()
}

fn parse_dialogue(
    object: &Map<String, Value>,
    location: &SourceLocation,
) -> Result<ScriptInstruction, NarrativeError> {
    let text = field(object, "say")
        .or_else(|| field(object, "text"))
        .and_then(scalar_text)
        .unwrap_or_default();
    let speaker = object.get("speaker").and_then(scalar_text);

    let choices = match field(object, "choices").or_else(|| field(object, "choice")) {
        Some(raw) => {
            let options = normalize_list(raw)
                .iter()
                .map(|entry| parse_choice(entry, location))
                .collect::<Result<Vec<_>, _>>()?;
            (!options.is_empty()).then_some(options)
        }
        None => None,
    };

    Ok(ScriptInstruction::Dialogue {
        speaker,
        text,
        actions: Vec::new(),
        choices,
        location: location.clone(),
    })
}

fn parse_choice(entry: &Value, location: &SourceLocation) -> Result<ChoiceOption, NarrativeError> {
    if let Value::String(text) = entry {
        return Ok(ChoiceOption::plain(text.clone()));
    }

    let Some(object) = entry.as_object() else {
        return Err(NarrativeError::parse(
            "Invalid choice format",
            location.clone(),
        ));
    };

    let Some(text) = field(object, "text")
        .or_else(|| field(object, "say"))
        .and_then(scalar_text)
    else {
        return Err(NarrativeError::parse(
            "Choice entry must have text",
            location.clone(),
        ));
    };

    let target = field(object, "target")
        .or_else(|| field(object, "goto"))
        .or_else(|| field(object, "jump"))
        .and_then(scalar_text);
    let condition = object.get("if").and_then(scalar_text);
    let actions = object
        .get("actions")
        .or_else(|| object.get("action"))
        .map(normalize_list)
        .unwrap_or_default();

    Ok(ChoiceOption {
        text,
        target,
        condition,
        actions,
    })
}

/// A key whose value is `null` counts as absent, so aliases still apply.
fn field<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).filter(|value| !value.is_null())
}

fn normalize_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn invalid_format(location: &SourceLocation) -> NarrativeError {
    NarrativeError::parse("Invalid instruction format", location.clone())
}
