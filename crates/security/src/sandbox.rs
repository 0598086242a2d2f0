//! Process-level sandbox.
//!
//! On macOS the binary re-executes itself under `sandbox-exec` with a
//! deny-by-default profile that only allows writes below the working
//! directory. Elsewhere there is no equivalent and only path-level checks
//! apply.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

/// Flag appended to the re-executed command line so the child does not recurse.
pub const NO_SANDBOX_FLAG: &str = "--no-sandbox";

/// Seatbelt profile. `CWD` and `HOME` are passed as parameters.
pub const SANDBOX_PROFILE: &str = r#"
(version 1)

;; deny everything by default
(deny default)

;; allow reading files from anywhere on host
(allow file-read*)

;; allow exec/fork (children inherit policy)
(allow process-exec)
(allow process-fork)

;; allow signals to self
(allow signal (target self))

;; allow read access to system information
(allow sysctl-read
  (sysctl-name "hw.activecpu") (sysctl-name "hw.busfrequency_compat")
  (sysctl-name "hw.byteorder") (sysctl-name "hw.cacheconfig")
  (sysctl-name "hw.cachelinesize_compat") (sysctl-name "hw.cpufamily")
  (sysctl-name "hw.cpufrequency_compat") (sysctl-name "hw.cputype")
  (sysctl-name "hw.l1dcachesize_compat") (sysctl-name "hw.l1icachesize_compat")
  (sysctl-name "hw.l2cachesize_compat") (sysctl-name "hw.l3cachesize_compat")
  (sysctl-name "hw.logicalcpu_max") (sysctl-name "hw.machine")
  (sysctl-name "hw.ncpu") (sysctl-name "hw.nperflevels")
  (sysctl-name "hw.optional.arm.FEAT_BF16") (sysctl-name "hw.optional.arm.FEAT_DotProd")
  (sysctl-name "hw.optional.arm.FEAT_FCMA") (sysctl-name "hw.optional.arm.FEAT_FHM")
  (sysctl-name "hw.optional.arm.FEAT_FP16") (sysctl-name "hw.optional.arm.FEAT_I8MM")
  (sysctl-name "hw.optional.arm.FEAT_JSCVT") (sysctl-name "hw.optional.arm.FEAT_LSE")
  (sysctl-name "hw.optional.arm.FEAT_RDM") (sysctl-name "hw.optional.arm.FEAT_SHA512")
  (sysctl-name "hw.optional.armv8_2_sha512") (sysctl-name "hw.packages")
  (sysctl-name "hw.pagesize_compat") (sysctl-name "hw.physicalcpu_max")
  (sysctl-name "hw.tbfrequency_compat") (sysctl-name "hw.vectorunit")
  (sysctl-name "kern.hostname") (sysctl-name "kern.maxfilesperproc")
  (sysctl-name "kern.osproductversion") (sysctl-name "kern.osrelease")
  (sysctl-name "kern.ostype") (sysctl-name "kern.osvariant_status")
  (sysctl-name "kern.osversion") (sysctl-name "kern.secure_kernel")
  (sysctl-name "kern.usrstack64") (sysctl-name "kern.version")
  (sysctl-name "sysctl.proc_cputype") (sysctl-name-prefix "hw.perflevel"))

;; allow writes to specific paths
(allow file-write*
  (subpath (param "CWD"))
  (subpath (string-append (param "HOME") "/.cache"))
  (subpath (string-append (param "HOME") "/.gitconfig"))
  (literal "/dev/stdout") (literal "/dev/stderr") (literal "/dev/null"))

;; allow communication with system services
(allow mach-lookup
  (global-name "com.apple.sysmond")
  (global-name "com.apple.SystemConfiguration.configd"))

;; allow system configuration access
(allow system-info)

;; enable terminal access
(allow file-ioctl (regex #"^/dev/tty.*"))

;; allow outbound network traffic
(allow network-outbound)
"#;

/// Where process-level enforcement stands after [`enter`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxState {
    /// Turned off by the operator (or already inside the sandboxed child).
    Disabled,
    /// No OS mechanism on this platform.
    Unavailable,
}

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("cannot locate current executable: {0}")]
    CurrentExe(std::io::Error),

    #[error("failed to re-execute under sandbox-exec: {0}")]
    Exec(std::io::Error),
}

/// Build the `sandbox-exec` invocation that re-runs `exe` with `args`.
pub fn sandbox_command(exe: &Path, args: &[OsString], cwd: &Path, home: &Path) -> Command {
    let mut cmd = Command::new("sandbox-exec");
    cmd.arg("-D")
        .arg(format!("CWD={}", cwd.display()))
        .arg("-D")
        .arg(format!("HOME={}", home.display()))
        .arg("-p")
        .arg(SANDBOX_PROFILE)
        .arg(exe)
        .args(args)
        .arg(NO_SANDBOX_FLAG);
    cmd
}

/// Enter the process-level sandbox unless `disabled`.
///
/// On macOS this replaces the current process and only returns on failure.
pub fn enter(disabled: bool, cwd: &Path) -> Result<SandboxState, SandboxError> {
    if disabled {
        tracing::debug!("Process sandbox disabled");
        return Ok(SandboxState::Disabled);
    }
    reexec(cwd)
}

#[cfg(target_os = "macos")]
fn reexec(cwd: &Path) -> Result<SandboxState, SandboxError> {
    use std::os::unix::process::CommandExt;

    let exe = std::env::current_exe().map_err(SandboxError::CurrentExe)?;
    let args: Vec<OsString> = std::env::args_os().skip(1).collect();
    let home = std::env::var_os("HOME")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| std::path::PathBuf::from("/"));

    tracing::debug!(cwd = %cwd.display(), "Re-executing under sandbox-exec");
    let err = sandbox_command(&exe, &args, cwd, &home).exec();
    Err(SandboxError::Exec(err))
}

#[cfg(not(target_os = "macos"))]
fn reexec(_cwd: &Path) -> Result<SandboxState, SandboxError> {
    Ok(SandboxState::Unavailable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_passes_params_and_disables_recursion() {
        let cmd = sandbox_command(
            Path::new("/usr/local/bin/ai"),
            &[OsString::from("act"), OsString::from("list files")],
            Path::new("/work"),
            Path::new("/Users/me"),
        );

        assert_eq!(cmd.get_program(), "sandbox-exec");
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args[0..4], ["-D", "CWD=/work", "-D", "HOME=/Users/me"]);
        assert_eq!(args[4], "-p");
        assert!(args[5].contains("(deny default)"));
        assert_eq!(args[6..], ["/usr/local/bin/ai", "act", "list files", NO_SANDBOX_FLAG]);
    }

    #[test]
    fn profile_confines_writes_to_cwd() {
        assert!(SANDBOX_PROFILE.contains(r#"(subpath (param "CWD"))"#));
        assert!(SANDBOX_PROFILE.contains("(allow network-outbound)"));
    }

    #[test]
    fn disabled_sandbox_returns_immediately() {
        let state = enter(true, Path::new("/")).unwrap();
        assert_eq!(state, SandboxState::Disabled);
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn other_platforms_report_unavailable() {
        let state = enter(false, Path::new("/")).unwrap();
        assert_eq!(state, SandboxState::Unavailable);
    }
}
