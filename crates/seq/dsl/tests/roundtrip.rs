//! Property tests: generate/parse/compile round trip and parser totality.
//!
//! The round-trip strategy builds documents free of dictionary-dependent
//! formatting quirks: no boolean arguments (bare TRUE/FALSE only become
//! booleans under a dictionary), repeats in single-tuple form (re-grouping
//! is the dictionary arity's job), and no name hints.

use proptest::collection::vec;
use proptest::option;
use proptest::prelude::*;
use seq_dsl::{compile, generate, parse, CompileOptions};
use seq_types::{
    Argument, HardwareCommand, ImmediateCommand, MetadataMap, Model, ModelValue, Request,
    SeqDocument, Step, TimeTag, VariableDeclaration, VariableType,
};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,11}"
}

fn arb_stem() -> impl Strategy<Value = String> {
    "[A-Z][A-Z0-9_]{0,11}"
}

fn arb_description() -> impl Strategy<Value = Option<String>> {
    option::of("[a-z][a-z ]{0,18}[a-z]")
}

fn arb_variable(kind: &'static str, var_type: VariableType) -> impl Strategy<Value = VariableDeclaration> {
    "[A-Z]{1,4}[0-9]{2}".prop_map(move |head| {
        VariableDeclaration::new(format!("{head}{kind}"), var_type)
    })
}

fn arb_declarations() -> impl Strategy<Value = Option<Vec<VariableDeclaration>>> {
    let one = prop_oneof![
        arb_variable("INT", VariableType::Int),
        arb_variable("UINT", VariableType::Uint),
        arb_variable("FLT", VariableType::Float),
        arb_variable("STR", VariableType::String),
        arb_variable("ENUM", VariableType::Enum),
    ];
    option::of(vec(one, 1..4))
}

fn arb_scalar_arg() -> impl Strategy<Value = Argument> {
    prop_oneof![
        "[a-z][a-z0-9 ]{0,10}".prop_map(Argument::string),
        (-100_000i32..100_000).prop_map(|n| Argument::number(f64::from(n))),
        "0x[0-9A-F]{1,6}".prop_map(|v| Argument::Hex { value: v, name: None }),
        "[A-Z][A-Z0-9_]{0,8}".prop_map(Argument::symbol),
    ]
}

fn arb_arg() -> impl Strategy<Value = Argument> {
    prop_oneof![
        4 => arb_scalar_arg(),
        1 => vec(arb_scalar_arg(), 1..4)
            .prop_map(|tuple| Argument::Repeat { value: vec![tuple], name: None }),
    ]
}

fn arb_time() -> impl Strategy<Value = TimeTag> {
    let clock = (0i64..=23, 0i64..=59, 0i64..=59)
        .prop_map(|(h, m, s)| format!("{h:02}:{m:02}:{s:02}"));
    prop_oneof![
        Just(TimeTag::CommandComplete),
        (1980i64..=2100, 1i64..=365, clock.clone())
            .prop_map(|(y, d, c)| TimeTag::Absolute { tag: format!("{y:04}-{d:03}T{c}") }),
        (option::of(0i64..=365), clock.clone()).prop_map(|(day, c)| {
            let tag = match day {
                Some(day) => format!("{day:03}T{c}"),
                None => c,
            };
            TimeTag::CommandRelative { tag }
        }),
        (prop_oneof![Just(""), Just("+"), Just("-")], clock)
            .prop_map(|(sign, c)| TimeTag::EpochRelative { tag: format!("{sign}{c}") }),
    ]
}

fn arb_metadata() -> impl Strategy<Value = MetadataMap> {
    let value = prop_oneof![
        "[a-z ]{0,12}".prop_map(Value::String),
        (-10_000i64..10_000).prop_map(Value::from),
        any::<bool>().prop_map(Value::Bool),
    ];
    vec(("[a-km-z][a-z_]{0,8}", value), 0..3).prop_map(|entries| {
        let mut map = MetadataMap::new();
        for (key, value) in entries {
            map.insert(key, value);
        }
        map
    })
}

fn arb_model() -> impl Strategy<Value = Model> {
    let value = prop_oneof![
        "[a-z]{1,8}".prop_map(ModelValue::String),
        (-1000i32..1000).prop_map(|n| ModelValue::Number(f64::from(n))),
        any::<bool>().prop_map(ModelValue::Boolean),
    ];
    ("[A-Z_]{1,10}", value, Just("00:00:10".to_string())).prop_map(|(variable, value, offset)| {
        Model { variable, value, offset }
    })
}

fn arb_command_step() -> impl Strategy<Value = Step> {
    (
        arb_stem(),
        vec(arb_arg(), 0..4),
        arb_time(),
        arb_description(),
        arb_metadata(),
        vec(arb_model(), 0..2),
    )
        .prop_map(|(stem, args, time, description, metadata, models)| Step::Command {
            stem,
            args,
            time,
            description,
            metadata: (!metadata.is_empty()).then_some(metadata),
            models: (!models.is_empty()).then_some(models),
        })
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        5 => arb_command_step(),
        1 => (arb_name(), option::of(1i32..8), option::of("[A-Z_]{1,8}"), vec(arb_scalar_arg(), 0..3), arb_time(), arb_description())
            .prop_map(|(sequence, engine, epoch, args, time, description)| Step::Activate {
                sequence, engine, epoch, args, time, description, metadata: None, models: None,
            }),
        1 => (arb_name(), vec(arb_scalar_arg(), 0..3), arb_time(), arb_description())
            .prop_map(|(name, args, time, description)| Step::GroundBlock {
                name, args, time, description, metadata: None, models: None,
            }),
    ]
}

fn arb_request() -> impl Strategy<Value = Request> {
    (
        arb_name(),
        option::of(arb_time()),
        vec(arb_command_step(), 1..3),
        arb_description(),
    )
        .prop_map(|(name, time, steps, description)| Request {
            name,
            time,
            ground_epoch: None,
            steps,
            metadata: None,
            description,
        })
}

fn arb_document() -> impl Strategy<Value = SeqDocument> {
    (
        arb_name(),
        arb_metadata(),
        arb_declarations(),
        arb_declarations(),
        option::of(vec(arb_step(), 1..5)),
        option::of(vec(
            (arb_stem(), vec(arb_scalar_arg(), 0..3), arb_description()).prop_map(
                |(stem, args, description)| ImmediateCommand {
                    stem,
                    args,
                    description,
                    metadata: None,
                },
            ),
            1..3,
        )),
        option::of(vec(
            (arb_stem(), arb_description())
                .prop_map(|(stem, description)| HardwareCommand { stem, description, metadata: None }),
            1..3,
        )),
        option::of(vec(arb_request(), 1..3)),
    )
        .prop_map(
            |(id, metadata, parameters, locals, steps, immediates, hardware, requests)| {
                let mut doc = SeqDocument::new(id);
                doc.metadata = metadata;
                doc.parameters = parameters;
                doc.locals = locals;
                doc.steps = steps;
                doc.immediate_commands = immediates;
                doc.hardware_commands = hardware;
                doc.requests = requests;
                doc
            },
        )
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    /// compile(parse(generate(d))) reproduces d for dictionary-free shapes.
    #[test]
    fn generated_documents_round_trip(doc in arb_document()) {
        let text = generate(&doc);
        let tree = parse(&text);
        let result = compile(&tree, &text, None, &doc.id, &CompileOptions::default());

        prop_assert!(!result.has_errors(), "errors in {:?} from {text}", result.diagnostics);
        prop_assert_eq!(result.seq, doc);
    }

    /// parse is total: every input produces a tree without panicking.
    #[test]
    fn parser_is_total(text in "\\PC*") {
        let tree = parse(&text);
        // Error nodes arrive sorted by start offset
        let starts: Vec<usize> = tree.error_nodes().iter().map(|e| e.span.start).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        prop_assert_eq!(starts, sorted);
    }

    /// Generation is deterministic.
    #[test]
    fn generation_is_deterministic(doc in arb_document()) {
        prop_assert_eq!(generate(&doc), generate(&doc));
    }
}
