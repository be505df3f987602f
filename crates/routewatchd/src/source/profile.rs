//! Device profiles: per-vendor output conventions for remote sessions.
//!
//! A profile only knows how to tidy command output (CRLF line endings, an
//! echoed command line, a trailing CLI prompt) and which command prints the
//! routing table by default. Route syntax is never interpreted.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `router#`, `switch(config)>`, `leaf1.dc:~#`
static CISCO_PROMPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.\-@/:()]+[>#]\s*$").expect("Invalid regex pattern"));

/// `RP/0/RSP0/CPU0:xr1#`
static XR_PROMPT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(RP/\d+/\w+/CPU\d+:)?[\w.\-]+[>#]\s*$").expect("Invalid regex pattern")
});

/// `{master:0}\nuser@mx1>`
static JUNOS_PROMPT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\{\w+(:\d+)?\}\s*)?[\w.\-]+@[\w.\-]+[>#%]\s*$").expect("Invalid regex pattern")
});

/// `root@host:~#`, `ops@gw:/tmp$`
static LINUX_PROMPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.\-]+@[\w.\-]+:\S*[$#]\s*$").expect("Invalid regex pattern"));

static GENERIC_PROMPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.\-@/:()\[\]~]+\s?[>#$%]\s*$").expect("Invalid regex pattern"));

/// Device family of a remote target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceProfile {
    /// Linux host or router (FRR, bird, plain kernel routing).
    Linux,
    /// Cisco IOS.
    #[default]
    CiscoIos,
    /// Cisco IOS-XE.
    CiscoXe,
    /// Cisco NX-OS.
    CiscoNxos,
    /// Cisco IOS-XR.
    CiscoXr,
    /// Arista EOS.
    AristaEos,
    /// Juniper Junos.
    JuniperJunos,
    /// Anything else; only generic prompt stripping.
    Generic,
}

impl DeviceProfile {
    /// Configuration name of the profile.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceProfile::Linux => "linux",
            DeviceProfile::CiscoIos => "cisco_ios",
            DeviceProfile::CiscoXe => "cisco_xe",
            DeviceProfile::CiscoNxos => "cisco_nxos",
            DeviceProfile::CiscoXr => "cisco_xr",
            DeviceProfile::AristaEos => "arista_eos",
            DeviceProfile::JuniperJunos => "juniper_junos",
            DeviceProfile::Generic => "generic",
        }
    }

    /// Command printing the routing table when none is configured.
    pub fn default_command(&self) -> &'static str {
        match self {
            DeviceProfile::Linux => "ip route show",
            DeviceProfile::CiscoXr => "show route",
            DeviceProfile::JuniperJunos => "show route | no-more",
            DeviceProfile::CiscoIos
            | DeviceProfile::CiscoXe
            | DeviceProfile::CiscoNxos
            | DeviceProfile::AristaEos
            | DeviceProfile::Generic => "show ip route",
        }
    }

    fn prompt_pattern(&self) -> &'static Regex {
        match self {
            DeviceProfile::Linux => &LINUX_PROMPT_RE,
            DeviceProfile::CiscoIos
            | DeviceProfile::CiscoXe
            | DeviceProfile::CiscoNxos
            | DeviceProfile::AristaEos => &CISCO_PROMPT_RE,
            DeviceProfile::CiscoXr => &XR_PROMPT_RE,
            DeviceProfile::JuniperJunos => &JUNOS_PROMPT_RE,
            DeviceProfile::Generic => &GENERIC_PROMPT_RE,
        }
    }

    /// True when `line` looks like this device's CLI prompt.
    pub fn is_prompt(&self, line: &str) -> bool {
        self.prompt_pattern().is_match(line.trim_end())
    }

    /// Tidies raw session output for `command`.
    ///
    /// Converts CRLF to LF, drops a leading echo of the command (optionally
    /// prefixed by a prompt) and a trailing prompt line. Everything else is
    /// returned verbatim and in order.
    pub fn clean_output(&self, command: &str, raw: &str) -> String {
        let text = raw.replace("\r\n", "\n");
        let mut lines: Vec<&str> = text.split('\n').collect();

        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }
        if lines.last().is_some_and(|l| self.is_prompt(l)) {
            lines.pop();
        }

        let first_content = lines.iter().position(|l| !l.trim().is_empty());
        if let Some(idx) = first_content {
            if lines[idx].trim_end().ends_with(command.trim()) {
                lines.drain(..=idx);
            }
        }

        lines.join("\n")
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
