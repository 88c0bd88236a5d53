//! Rich diagnostic error types for the rankwork engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text so definition authors know exactly what
//! went wrong and how to fix it.
//!
//! Lookup misses are deliberately absent: a missing attribute or need is
//! recorded as [`INVALID_VALUE`](crate::signal::INVALID_VALUE) and excluded
//! from aggregation, and a rule lookup that misses reads `None`.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the rankwork engine.
#[derive(Debug, Error, Diagnostic)]
pub enum RankError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    World(#[from] WorldError),
}

// ---------------------------------------------------------------------------
// Definition errors
// ---------------------------------------------------------------------------

/// Problems found while loading or validating signal/rule definitions.
///
/// None of these stop loading: the offending definition is kept, flagged
/// invalid, and evaluates to a neutral zero.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum DefinitionError {
    #[error("failed to read definitions from {path}: {message}")]
    #[diagnostic(
        code(rankwork::definition::io),
        help("Ensure the definitions file exists and is readable.")
    )]
    Io { path: String, message: String },

    #[error("failed to parse definitions: {message}")]
    #[diagnostic(
        code(rankwork::definition::parse),
        help("Check the TOML syntax. Every [[signal]], [[rule]] and [[category]] needs a `name`.")
    )]
    Parse { message: String },

    #[error("{kind} '{name}' is missing required field `{field}`")]
    #[diagnostic(
        code(rankwork::definition::missing_field),
        help("The source kind or condition type in use requires this field; add it to the definition.")
    )]
    MissingField {
        kind: &'static str,
        name: String,
        field: &'static str,
    },

    #[error("{kind} '{name}' has an invalid interval '{text}'")]
    #[diagnostic(
        code(rankwork::definition::interval),
        help("Intervals are written \"min~max\", \"~max\", \"min~\" or as a single number.")
    )]
    InvalidInterval {
        kind: &'static str,
        name: String,
        text: String,
    },

    #[error("rule '{name}' has no task or sub-task targets")]
    #[diagnostic(
        code(rankwork::definition::no_targets),
        help("Add at least one entry to `targets`, e.g. {{ category = \"Cooking\" }}.")
    )]
    NoTargets { name: String },

    #[error("rule '{rule}' references unknown signal '{signal}'")]
    #[diagnostic(
        code(rankwork::definition::unknown_signal),
        help("Define a [[signal]] with this name, or fix the reference.")
    )]
    UnknownSignal { rule: String, signal: String },

    #[error("rule '{rule}' requests '{mode}' from signal '{signal}', which is not {capability}")]
    #[diagnostic(
        code(rankwork::definition::capability),
        help("Set `{capability} = true` on the signal, or use the `global` request mode.")
    )]
    CapabilityMismatch {
        rule: String,
        signal: String,
        mode: String,
        capability: &'static str,
    },

    #[error("{kind} '{name}' is defined more than once")]
    #[diagnostic(
        code(rankwork::definition::duplicate),
        help("Definition names must be unique; the first definition is kept.")
    )]
    DuplicateName { kind: &'static str, name: String },

    #[error("rule '{rule}' targets unknown {level} '{target}'")]
    #[diagnostic(
        code(rankwork::definition::unknown_target),
        help("Declare the target in a [[category]] (as its name or one of its sub_tasks).")
    )]
    UnknownTarget {
        rule: String,
        level: &'static str,
        target: String,
    },
}

// ---------------------------------------------------------------------------
// Evaluation errors
// ---------------------------------------------------------------------------

/// Failures while evaluating one signal, or one rule for one agent.
///
/// These are caught at the unit boundary and turn into a zero contribution.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum EvalError {
    #[error("source evaluator failed for signal '{signal}': {message}")]
    #[diagnostic(
        code(rankwork::eval::source),
        help("The signal's world query failed. Check the host world integration.")
    )]
    Source { signal: String, message: String },

    #[error("modifier provider failed for key '{key}': {message}")]
    #[diagnostic(
        code(rankwork::eval::provider),
        help("The external modifier provider returned an error; the rule contributes zero.")
    )]
    Provider { key: String, message: String },

    #[error("rule '{rule}' produced an unusable score: {message}")]
    #[diagnostic(
        code(rankwork::eval::score),
        help("Check the rule's score ranges and modifier multipliers for infinite values.")
    )]
    Score { rule: String, message: String },

    #[error("no evaluator registered for source kind '{kind}'")]
    #[diagnostic(
        code(rankwork::eval::missing_evaluator),
        help("Register an evaluator with SignalEngine::register for this source kind.")
    )]
    MissingEvaluator { kind: String },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file: {path}")]
    #[diagnostic(
        code(rankwork::config::read),
        help("Ensure the file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config file: {path}")]
    #[diagnostic(
        code(rankwork::config::write),
        help("Check that the parent directory is writable.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(rankwork::config::parse),
        help("Check the TOML syntax. Run `rankwork config init` for a template.")
    )]
    Parse { path: String, message: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(rankwork::config::invalid),
        help("Intervals must be > 0 and the urgent interval shorter than the normal one.")
    )]
    Invalid { message: String },
}

// ---------------------------------------------------------------------------
// World snapshot errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum WorldError {
    #[error("failed to read world snapshot: {path}")]
    #[diagnostic(
        code(rankwork::world::read),
        help("Ensure the snapshot file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse world snapshot: {message}")]
    #[diagnostic(
        code(rankwork::world::parse),
        help("World snapshots are JSON documents with `agents`, `objects` and `zones` arrays.")
    )]
    Parse { message: String },
}

/// Convenience alias for top-level results.
pub type RankResult<T> = std::result::Result<T, RankError>;

/// Result type for definition loading and validation.
pub type DefinitionResult<T> = std::result::Result<T, DefinitionError>;

/// Result type for signal and rule evaluation.
pub type EvalResult<T> = std::result::Result<T, EvalError>;

/// Result type for engine configuration.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type for world snapshot loading.
pub type WorldResult<T> = std::result::Result<T, WorldError>;
