use anyhow::{anyhow, Result};
use std::fmt;
use std::str::FromStr;

/// Where inference runs. Chosen once at startup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecutionDevice {
    /// Use the best device the backend supports.
    #[default]
    Auto,
    Cpu,
}

impl ExecutionDevice {
    /// Resolve `Auto` against what a backend can run on. Backends pass the
    /// devices they support, most preferred first.
    pub fn resolve(self, supported: &[ExecutionDevice]) -> Result<ExecutionDevice> {
        match self {
            ExecutionDevice::Auto => supported
                .iter()
                .copied()
                .find(|d| *d != ExecutionDevice::Auto)
                .ok_or_else(|| anyhow!("backend reports no execution device")),
            requested if supported.contains(&requested) => Ok(requested),
            requested => Err(anyhow!("execution device '{}' is not supported", requested)),
        }
    }
}

impl fmt::Display for ExecutionDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionDevice::Auto => write!(f, "auto"),
            ExecutionDevice::Cpu => write!(f, "cpu"),
        }
    }
}

impl FromStr for ExecutionDevice {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(ExecutionDevice::Auto),
            "cpu" => Ok(ExecutionDevice::Cpu),
            other => Err(anyhow!("unknown execution device '{}' (expected auto|cpu)", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_resolves_to_first_supported() -> Result<()> {
        let dev = ExecutionDevice::Auto.resolve(&[ExecutionDevice::Cpu])?;
        assert_eq!(dev, ExecutionDevice::Cpu);
        Ok(())
    }

    #[test]
    fn parses_names() -> Result<()> {
        assert_eq!("CPU".parse::<ExecutionDevice>()?, ExecutionDevice::Cpu);
        assert_eq!(" auto ".parse::<ExecutionDevice>()?, ExecutionDevice::Auto);
        assert!("cuda".parse::<ExecutionDevice>().is_err());
        Ok(())
    }

    #[test]
    fn empty_support_list_fails() {
        assert!(ExecutionDevice::Auto.resolve(&[]).is_err());
        assert!(ExecutionDevice::Cpu.resolve(&[]).is_err());
    }
}
