//! Shared test utilities for bootroot tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use bootroot::config::{
    BOOT_ROOT_COMPRESSION_LEVEL, BOOT_ROOT_COMPRESSION_TYPE, BOOT_ROOT_SIZE_PAD,
};
use bootroot::context::BuildContext;
use bootroot::error::BuildError;
use bootroot::interrupt::Interrupts;
use bootroot::process::{Cmd, CommandResult, CommandRunner, SystemRunner};
use bootroot::target::{TargetService, TargetSpec};
use bootroot::Pipeline;
use tempfile::TempDir;

type Handler = Box<dyn Fn(&Cmd) -> CommandResult + Send + Sync>;

/// Command runner that answers from per-program handlers and records every
/// command it is asked to run. Unknown programs succeed with no output.
#[derive(Default)]
pub struct FakeRunner {
    handlers: HashMap<String, Handler>,
    calls: Mutex<Vec<Cmd>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `program` with `handler`.
    pub fn on(
        mut self,
        program: &str,
        handler: impl Fn(&Cmd) -> CommandResult + Send + Sync + 'static,
    ) -> Self {
        self.handlers.insert(program.to_string(), Box::new(handler));
        self
    }

    /// Answer `program` with a fixed exit code.
    pub fn exit(self, program: &str, code: i32) -> Self {
        self.on(program, move |_| CommandResult::failed(code, "simulated failure"))
    }

    /// Run `program` for real.
    pub fn passthrough(self, program: &str) -> Self {
        self.on(program, |cmd| {
            SystemRunner
                .run(cmd)
                .unwrap_or_else(|e| CommandResult::failed(-1, e.to_string()))
        })
    }

    /// Answer `du` with a fixed size in KiB.
    pub fn du_reports(self, kib: u64) -> Self {
        self.on("du", move |cmd| {
            let path = cmd.get_args().last().cloned().unwrap_or_default();
            CommandResult::ok(format!("{}\t{}\n", kib, path))
        })
    }

    pub fn calls(&self) -> Vec<Cmd> {
        self.calls.lock().unwrap().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| c.program().to_string())
            .collect()
    }

    pub fn ran(&self, program: &str) -> bool {
        self.programs().iter().any(|p| p == program)
    }

    pub fn find(&self, program: &str) -> Option<Cmd> {
        self.calls().into_iter().find(|c| c.program() == program)
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, cmd: &Cmd) -> Result<CommandResult, BuildError> {
        self.calls.lock().unwrap().push(cmd.clone());
        Ok(match self.handlers.get(cmd.program()) {
            Some(handler) => handler(cmd),
            None => CommandResult::ok(""),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetEvent {
    Create(TargetSpec),
    Release(TargetSpec),
}

/// Target service that records calls. `create` makes the mountpoint and an
/// empty archive file so later stages have something to work on.
#[derive(Default)]
pub struct RecordingTarget {
    events: Mutex<Vec<TargetEvent>>,
    fail_create: bool,
    fail_release: bool,
    interrupt_during_create: Option<Interrupts>,
    interrupt_from_thread: Option<Interrupts>,
    release_delay: Duration,
    releases_finished: AtomicUsize,
}

impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_release(mut self) -> Self {
        self.fail_release = true;
        self
    }

    /// Deliver an interrupt while `create` is in progress.
    pub fn interrupted_by(mut self, interrupts: Interrupts) -> Self {
        self.interrupt_during_create = Some(interrupts);
        self
    }

    /// Deliver an interrupt from another thread, the way the SIGINT handler
    /// does, then fail `create` as a killed `mount` would.
    pub fn interrupted_from_thread(mut self, interrupts: Interrupts) -> Self {
        self.interrupt_from_thread = Some(interrupts);
        self
    }

    /// Take `delay` to finish each release.
    pub fn slow_release(mut self, delay: Duration) -> Self {
        self.release_delay = delay;
        self
    }

    /// Number of releases that ran to completion.
    pub fn releases_finished(&self) -> usize {
        self.releases_finished.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<TargetEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl TargetService for RecordingTarget {
    fn create(&self, spec: &TargetSpec) -> Result<(), BuildError> {
        self.events
            .lock()
            .unwrap()
            .push(TargetEvent::Create(spec.clone()));

        fs::create_dir_all(&spec.mount_point).unwrap();
        fs::create_dir_all(spec.archive.parent().unwrap()).unwrap();
        fs::write(&spec.archive, b"ramdisk image").unwrap();

        if let Some(interrupts) = &self.interrupt_during_create {
            interrupts.interrupt();
        }
        if let Some(interrupts) = &self.interrupt_from_thread {
            let handler = interrupts.clone();
            thread::spawn(move || handler.interrupt());
            while !interrupts.was_interrupted() {
                thread::sleep(Duration::from_millis(1));
            }
            return Err(BuildError::TargetCreateFailure {
                command: "mount".to_string(),
                status: -1,
            });
        }
        if self.fail_create {
            return Err(BuildError::TargetCreateFailure {
                command: "mount".to_string(),
                status: 32,
            });
        }
        Ok(())
    }

    fn release(&self, spec: &TargetSpec) -> Result<(), BuildError> {
        self.events
            .lock()
            .unwrap()
            .push(TargetEvent::Release(spec.clone()));
        thread::sleep(self.release_delay);

        if self.fail_release {
            return Err(BuildError::TargetReleaseFailure {
                command: "umount".to_string(),
                status: 16,
            });
        }
        self.releases_finished.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Test environment with the directory layout of one invocation.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    pub pkg_image: PathBuf,
    pub tmp_dir: PathBuf,
    pub staging: PathBuf,
    pub media_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path();

        let pkg_image = base.join("pkg_image");
        let tmp_dir = base.join("tmp");
        let staging = base.join("bootroot");
        let media_dir = base.join("media");

        for dir in [&pkg_image, &tmp_dir, &staging, &media_dir] {
            fs::create_dir_all(dir).expect("Failed to create test dir");
        }

        Self {
            _temp_dir: temp_dir,
            pkg_image,
            tmp_dir,
            staging,
            media_dir,
        }
    }

    pub fn context(&self) -> BuildContext {
        BuildContext::new(
            Path::new("manifest.json"),
            &self.pkg_image,
            &self.tmp_dir,
            &self.staging,
            &self.media_dir,
        )
    }
}

/// Populate a small bootroot staging tree.
pub fn create_mock_bootroot(staging: &Path) {
    for dir in ["etc", "sbin", "usr/lib", "dev"] {
        fs::create_dir_all(staging.join(dir)).expect("Failed to create staging dir");
    }
    fs::write(staging.join("etc/system"), "set noexec_user_stack=1\n").unwrap();
    fs::write(staging.join("sbin/init"), "#!/bin/sh\n").unwrap();
    symlink("../sbin/init", staging.join("usr/lib/init")).unwrap();
}

/// Manifest values for a build.
pub fn manifest(kind: &str, level: &str, padding: Option<&str>) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();
    values.insert(BOOT_ROOT_COMPRESSION_TYPE.to_string(), kind.to_string());
    values.insert(BOOT_ROOT_COMPRESSION_LEVEL.to_string(), level.to_string());
    if let Some(padding) = padding {
        values.insert(BOOT_ROOT_SIZE_PAD.to_string(), padding.to_string());
    }
    values
}

/// Pipeline wired to the given fakes.
pub fn pipeline(
    runner: &Arc<FakeRunner>,
    target: &Arc<RecordingTarget>,
    interrupts: Interrupts,
) -> Pipeline {
    let runner: Arc<dyn CommandRunner> = runner.clone();
    let target: Arc<dyn TargetService> = target.clone();
    Pipeline::new(runner, target, interrupts)
}
