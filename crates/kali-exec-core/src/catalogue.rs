//! Tool catalogue: per-tool isolation policies and the command vectors each
//! action produces.
//!
//! Purely mechanical. Targets and options are passed through verbatim; no
//! validation or output parsing happens here.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::command::CommandVector;
use crate::policy::IsolationPolicy;

/// Errors raised while resolving tool or action names.
#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("unknown action: {0}")]
    UnknownAction(String),
}

/// A catalogued command-line tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Nmap,
    Nm,
    Objdump,
    Strings,
    Tshark,
    Traceroute,
}

impl Tool {
    pub const ALL: [Tool; 6] = [
        Tool::Nmap,
        Tool::Nm,
        Tool::Objdump,
        Tool::Strings,
        Tool::Tshark,
        Tool::Traceroute,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Tool::Nmap => "nmap",
            Tool::Nm => "nm",
            Tool::Objdump => "objdump",
            Tool::Strings => "strings",
            Tool::Tshark => "tshark",
            Tool::Traceroute => "traceroute",
        }
    }

    /// Executable name; identical to the tool name for every entry.
    pub fn program(&self) -> &'static str {
        self.name()
    }

    pub fn from_name(name: &str) -> Result<Self, CatalogueError> {
        Tool::ALL
            .into_iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| CatalogueError::UnknownTool(name.to_string()))
    }

    /// Network scanners and capture get networking, 2g and five minutes;
    /// binary inspection runs offline with the defaults.
    pub fn policy(&self) -> IsolationPolicy {
        let base = IsolationPolicy::new(self.name());
        match self {
            Tool::Nmap | Tool::Tshark => base
                .with_network(true)
                .with_memory_limit("2g")
                .with_time_budget(Duration::from_secs(300)),
            Tool::Traceroute => base.with_network(true),
            Tool::Nm | Tool::Objdump | Tool::Strings => base,
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Optional knobs some actions take. Unset values fall back to the
/// documented defaults; empty filters are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOptions {
    /// objdump section to disassemble (default `.text`).
    pub section: Option<String>,
    /// strings minimum length (default 6).
    pub min_length: Option<u32>,
    /// strings offset radix: d, o or x (default x).
    pub radix: Option<String>,
    /// strings encoding: s, S, b or l (default S).
    pub encoding: Option<String>,
    /// tshark capture duration in seconds (default 30).
    pub duration_secs: Option<u32>,
    /// tshark capture filter (live) or display filter (analyze).
    pub filter: Option<String>,
}

/// Every action the catalogue knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    NmapBasic,
    NmapIntense,
    NmapStealth,
    NmapQuick,
    NmapVulnerability,
    NmBasic,
    NmDynamic,
    NmDemangle,
    NmNumericSort,
    NmSizeSort,
    NmUndefined,
    ObjdumpFileHeaders,
    ObjdumpDisassemble,
    ObjdumpSymbols,
    ObjdumpSectionHeaders,
    ObjdumpFullContents,
    StringsBasic,
    StringsMinLength,
    StringsOffsets,
    StringsEncoding,
    TsharkCapture,
    TsharkAnalyze,
    TsharkHttp,
    TsharkProtocolHierarchy,
    TsharkConversations,
    TsharkExpert,
    Traceroute,
}

impl ActionKind {
    pub const ALL: [ActionKind; 27] = [
        ActionKind::NmapBasic,
        ActionKind::NmapIntense,
        ActionKind::NmapStealth,
        ActionKind::NmapQuick,
        ActionKind::NmapVulnerability,
        ActionKind::NmBasic,
        ActionKind::NmDynamic,
        ActionKind::NmDemangle,
        ActionKind::NmNumericSort,
        ActionKind::NmSizeSort,
        ActionKind::NmUndefined,
        ActionKind::ObjdumpFileHeaders,
        ActionKind::ObjdumpDisassemble,
        ActionKind::ObjdumpSymbols,
        ActionKind::ObjdumpSectionHeaders,
        ActionKind::ObjdumpFullContents,
        ActionKind::StringsBasic,
        ActionKind::StringsMinLength,
        ActionKind::StringsOffsets,
        ActionKind::StringsEncoding,
        ActionKind::TsharkCapture,
        ActionKind::TsharkAnalyze,
        ActionKind::TsharkHttp,
        ActionKind::TsharkProtocolHierarchy,
        ActionKind::TsharkConversations,
        ActionKind::TsharkExpert,
        ActionKind::Traceroute,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::NmapBasic => "nmap-basic",
            ActionKind::NmapIntense => "nmap-intense",
            ActionKind::NmapStealth => "nmap-stealth",
            ActionKind::NmapQuick => "nmap-quick",
            ActionKind::NmapVulnerability => "nmap-vulnerability",
            ActionKind::NmBasic => "nm-basic",
            ActionKind::NmDynamic => "nm-dynamic",
            ActionKind::NmDemangle => "nm-demangle",
            ActionKind::NmNumericSort => "nm-numeric-sort",
            ActionKind::NmSizeSort => "nm-size-sort",
            ActionKind::NmUndefined => "nm-undefined",
            ActionKind::ObjdumpFileHeaders => "objdump-file-headers",
            ActionKind::ObjdumpDisassemble => "objdump-disassemble",
            ActionKind::ObjdumpSymbols => "objdump-symbols",
            ActionKind::ObjdumpSectionHeaders => "objdump-section-headers",
            ActionKind::ObjdumpFullContents => "objdump-full-contents",
            ActionKind::StringsBasic => "strings-basic",
            ActionKind::StringsMinLength => "strings-min-length",
            ActionKind::StringsOffsets => "strings-offsets",
            ActionKind::StringsEncoding => "strings-encoding",
            ActionKind::TsharkCapture => "tshark-capture",
            ActionKind::TsharkAnalyze => "tshark-analyze",
            ActionKind::TsharkHttp => "tshark-http",
            ActionKind::TsharkProtocolHierarchy => "tshark-protocol-hierarchy",
            ActionKind::TsharkConversations => "tshark-conversations",
            ActionKind::TsharkExpert => "tshark-expert",
            ActionKind::Traceroute => "traceroute",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, CatalogueError> {
        ActionKind::ALL
            .into_iter()
            .find(|a| a.name() == name)
            .ok_or_else(|| CatalogueError::UnknownAction(name.to_string()))
    }

    pub fn tool(&self) -> Tool {
        use ActionKind::*;
        match self {
            NmapBasic | NmapIntense | NmapStealth | NmapQuick | NmapVulnerability => Tool::Nmap,
            NmBasic | NmDynamic | NmDemangle | NmNumericSort | NmSizeSort | NmUndefined => Tool::Nm,
            ObjdumpFileHeaders | ObjdumpDisassemble | ObjdumpSymbols | ObjdumpSectionHeaders
            | ObjdumpFullContents => Tool::Objdump,
            StringsBasic | StringsMinLength | StringsOffsets | StringsEncoding => Tool::Strings,
            TsharkCapture | TsharkAnalyze | TsharkHttp | TsharkProtocolHierarchy
            | TsharkConversations | TsharkExpert => Tool::Tshark,
            Traceroute => Tool::Traceroute,
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One concrete request: an action, its target and options.
///
/// The target is a host, a binary, a pcap file or an interface name,
/// depending on the action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub target: String,
    #[serde(default)]
    pub options: ActionOptions,
}

impl Action {
    pub fn new(kind: ActionKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            options: ActionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ActionOptions) -> Self {
        self.options = options;
        self
    }

    /// Resolve an action by name.
    pub fn parse(
        name: &str,
        target: impl Into<String>,
        options: ActionOptions,
    ) -> Result<Self, CatalogueError> {
        Ok(Action::new(ActionKind::from_name(name)?, target).with_options(options))
    }

    pub fn tool(&self) -> Tool {
        self.kind.tool()
    }

    /// The command vector this action runs.
    pub fn command(&self) -> CommandVector {
        use ActionKind::*;
        let target = self.target.as_str();
        let opts = &self.options;
        let cmd = CommandVector::new(self.tool().program());
        let filter = opts.filter.as_deref().filter(|f| !f.is_empty());

        match self.kind {
            NmapBasic | NmBasic | StringsBasic | Traceroute => cmd.arg(target),
            NmapIntense => cmd.args(["-T4", "-A", target]),
            NmapStealth => cmd.args(["-sS", target]),
            NmapQuick => cmd.args(["-T4", "-F", target]),
            NmapVulnerability => cmd.args(["-sV", "--script", "vuln", target]),

            NmDynamic => cmd.args(["-D", target]),
            NmDemangle => cmd.args(["-C", target]),
            NmNumericSort => cmd.args(["-n", target]),
            NmSizeSort => cmd.args(["-S", target]),
            NmUndefined => cmd.args(["-u", target]),

            ObjdumpFileHeaders => cmd.args(["-f", target]),
            ObjdumpDisassemble => {
                let section = opts.section.as_deref().unwrap_or(".text");
                cmd.args(["-d", "-j", section, target])
            }
            ObjdumpSymbols => cmd.args(["-t", target]),
            ObjdumpSectionHeaders => cmd.args(["-h", target]),
            ObjdumpFullContents => cmd.args(["-x", target]),

            StringsMinLength => {
                let n = opts.min_length.unwrap_or(6).to_string();
                cmd.args(["-n", n.as_str(), target])
            }
            StringsOffsets => cmd.args(["-t", opts.radix.as_deref().unwrap_or("x"), target]),
            StringsEncoding => cmd.args(["-e", opts.encoding.as_deref().unwrap_or("S"), target]),

            TsharkCapture => {
                let duration = format!("duration:{}", opts.duration_secs.unwrap_or(30));
                let cmd = cmd.args(["-i", target, "-a", duration.as_str()]);
                match filter {
                    Some(f) => cmd.args(["-f", f]),
                    None => cmd,
                }
            }
            TsharkAnalyze => {
                let cmd = cmd.args(["-r", target]);
                match filter {
                    Some(f) => cmd.args(["-Y", f]),
                    None => cmd,
                }
            }
            TsharkHttp => cmd.args([
                "-r",
                target,
                "-Y",
                "http",
                "-T",
                "fields",
                "-e",
                "http.request.method",
                "-e",
                "http.request.uri",
            ]),
            TsharkProtocolHierarchy => cmd.args(["-r", target, "-q", "-z", "io,phs"]),
            TsharkConversations => cmd.args(["-r", target, "-q", "-z", "conv,ip"]),
            TsharkExpert => cmd.args(["-r", target, "-q", "-z", "expert"]),
        }
    }
}
