use crate::foundation::error::{ReelError, ReelResult};

/// Renderer flags used when the caller supplies none: a 30 kb window on chr1 of
/// `result_b1_md.bam`, unpacked reads, no legend, no y-axis scale.
pub const DEFAULT_TEMPLATE: [&str; 11] = [
    "-a",
    "result_b1_md.bam",
    "-s",
    "-S",
    "-p",
    "-r",
    "chr1:8869816-8899900",
    "-l",
    "-U",
    "-y",
    "20",
];

// Flags the orchestrator sets itself for each frame. Short flags that take a value may carry
// it attached (`-ofoo.png`), long flags may use `--flag=value`.
const VALUED_SHORT_FLAGS: [&str; 2] = ["-o", "-_"];
const SWITCH_SHORT_FLAGS: [&str; 2] = ["-*", "-A"];
// Switches may also hide inside a cluster of short flags (`-sA`, `-S*`).
const SWITCH_CHARS: [char; 2] = ['*', 'A'];
const LONG_FLAGS: [&str; 2] = ["--read-index", "--hide-x-scale"];

/// Renderer arguments shared by every frame of a reel.
///
/// Passed through verbatim; the only check is that none of the per-frame flags appear, either
/// alone or inside a cluster of short switches such as `-sA`. A token with anything besides
/// letters, digits and `*` after its dash (`-aA.bam`) is taken as a value, not a cluster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandTemplate {
    args: Vec<String>,
}

impl Default for CommandTemplate {
    fn default() -> Self {
        Self {
            args: DEFAULT_TEMPLATE.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CommandTemplate {
    pub fn new(args: Vec<String>) -> ReelResult<Self> {
        if let Some(flag) = args.iter().find(|a| is_reserved_flag(a)) {
            return Err(ReelError::validation(format!(
                "command template must not contain '{flag}': it is set per frame"
            )));
        }
        Ok(Self { args })
    }

    /// Use `args` when non-empty, otherwise [`DEFAULT_TEMPLATE`].
    pub fn from_args<I, S>(args: I) -> ReelResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        if args.is_empty() {
            return Ok(Self::default());
        }
        Self::new(args)
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

fn is_reserved_flag(arg: &str) -> bool {
    VALUED_SHORT_FLAGS.iter().any(|f| arg.starts_with(f))
        || SWITCH_SHORT_FLAGS.contains(&arg)
        || is_switch_cluster(arg)
        || LONG_FLAGS
            .iter()
            .any(|f| arg == *f || arg.strip_prefix(f).is_some_and(|rest| rest.starts_with('=')))
}

fn is_switch_cluster(arg: &str) -> bool {
    let Some(cluster) = arg.strip_prefix('-') else {
        return false;
    };
    !cluster.starts_with('-')
        && cluster.chars().all(|c| c.is_ascii_alphanumeric() || c == '*')
        && cluster.contains(SWITCH_CHARS)
}

#[cfg(test)]
#[path = "../../tests/unit/frame/template.rs"]
mod tests;
