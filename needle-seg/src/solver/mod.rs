//! 外部针分割程序.
//!
//! 调用约定: `<exe> [leading_args...] <imagePath> <x> <y> <z>`, 标准输出为六个浮点数.
//! 子进程以参数向量方式启动, 不经过 shell.

mod output;

pub use output::{parse_solver_output, SolverPoints};

use crate::consts::handoff::{DEFAULT_SOLVER_EXE, DEFAULT_TIMEOUT_SECS};
use crate::{NeedleResult, SolverFailure};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 轮询子进程状态的间隔.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// 分割后端: 给定已落盘的图像和种子点文本, 返回原始文本输出.
///
/// [`ExternalSolver`] 是真正调用子进程的实现; 测试中可以用进程内的实现替代.
pub trait SegmentationBackend {
    /// 运行一次分割.
    fn run(&self, image_path: &Path, seed_text: &str) -> NeedleResult<String>;
}

/// 外部程序配置.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct SolverConfig {
    /// 可执行文件. 不含路径分隔符时在 `PATH` 中查找.
    pub executable: PathBuf,

    /// 位于图像路径之前的额外参数 (例如由解释器运行脚本时的脚本路径).
    pub leading_args: Vec<String>,

    /// 超时时间 (秒). `None` 或非正数表示不限时.
    pub timeout_secs: Option<f64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from(DEFAULT_SOLVER_EXE),
            leading_args: vec![],
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl SolverConfig {
    /// 以可执行文件路径构建, 其它为默认值.
    pub fn with_executable<P: Into<PathBuf>>(executable: P) -> Self {
        Self {
            executable: executable.into(),
            ..Default::default()
        }
    }

    /// 有效的超时时间.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .and_then(|s| Duration::try_from_secs_f64(s).ok())
            .filter(|d| !d.is_zero())
    }
}

/// 取消令牌. 可以在其它线程中取消正在等待的外部程序.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// 新令牌.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求取消.
    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// 是否已被取消.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// 以子进程方式运行的外部分割程序.
#[derive(Clone, Debug, Default)]
pub struct ExternalSolver {
    config: SolverConfig,
    cancel: Option<CancelToken>,
}

impl ExternalSolver {
    /// 构建.
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// 绑定取消令牌.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// 配置.
    #[inline]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// 启动外部程序并阻塞等待其结束, 返回标准输出文本.
    ///
    /// 找不到程序、非零退出、超时或被取消时返回相应的 [`SolverFailure`].
    /// 超时或取消时子进程会被终止. 超时从启动算起, 同时覆盖读取输出的阶段.
    pub fn invoke(&self, image_path: &Path, seed_text: &str) -> Result<String, SolverFailure> {
        let exe = &self.config.executable;
        let mut cmd = Command::new(exe);
        cmd.args(&self.config.leading_args)
            .arg(image_path)
            .args(seed_text.split_whitespace())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        log::info!("calling solver: {cmd:?}");

        let mut child = cmd.spawn().map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => SolverFailure::NotFound(exe.clone()),
            _ => SolverFailure::Spawn {
                path: exe.clone(),
                source,
            },
        })?;

        // 在独立线程中读取管道, 防止子进程因管道写满而阻塞.
        // 读取线程不被 join: 管道被遗留的后台进程占用时, 它们在管道关闭后自行退出.
        let start = Instant::now();
        let (tx, rx) = mpsc::channel();
        spawn_reader(Pipe::Stdout, child.stdout.take(), tx.clone());
        spawn_reader(Pipe::Stderr, child.stderr.take(), tx);

        let status = match self.wait(&mut child, start) {
            Ok(status) => status,
            Err(failure) => {
                let _ = child.kill();
                let _ = child.wait();
                log::warn!("solver aborted: {failure}");
                return Err(failure);
            }
        };

        // 子进程已退出, 但其后台进程可能仍持有管道; 收集输出同样受超时与取消约束.
        let (stdout, stderr) = self.collect(&rx, start).map_err(|failure| {
            log::warn!("solver exited but collecting its output failed: {failure}");
            failure
        })?;

        if !status.success() {
            return Err(SolverFailure::NonZeroExit {
                code: status.code(),
                stderr: stderr.trim().to_string(),
            });
        }
        log::info!("output from solver: {}", stdout.trim());
        Ok(stdout)
    }

    /// 调用外部程序并解析输出, 得到外部程序坐标系下的针尖与针尾.
    ///
    /// 输出不是恰好六个浮点数时同样视为外部程序失败.
    pub fn solve(&self, image_path: &Path, seed_text: &str) -> NeedleResult<SolverPoints> {
        let raw = self.invoke(image_path, seed_text)?;
        Ok(parse_solver_output(&raw)?)
    }

    /// 超时或已被取消时返回相应的错误.
    fn check_deadline(&self, start: Instant) -> Result<(), SolverFailure> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(SolverFailure::Cancelled);
        }
        match self.config.timeout().filter(|t| start.elapsed() >= *t) {
            Some(t) => Err(SolverFailure::Timeout(t)),
            None => Ok(()),
        }
    }

    /// 轮询等待子进程结束, 期间检查超时与取消.
    fn wait(&self, child: &mut Child, start: Instant) -> Result<ExitStatus, SolverFailure> {
        loop {
            if let Some(status) = child.try_wait().map_err(SolverFailure::Io)? {
                return Ok(status);
            }
            self.check_deadline(start)?;
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// 等待两个读取线程送回标准输出与标准错误, 期间检查超时与取消.
    fn collect(
        &self,
        rx: &Receiver<PipeText>,
        start: Instant,
    ) -> Result<(String, String), SolverFailure> {
        let (mut stdout, mut stderr) = (None, None);
        while stdout.is_none() || stderr.is_none() {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok((Pipe::Stdout, text)) => stdout = Some(text.map_err(SolverFailure::Io)?),
                Ok((Pipe::Stderr, text)) => stderr = Some(text.map_err(SolverFailure::Io)?),
                Err(RecvTimeoutError::Timeout) => self.check_deadline(start)?,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(SolverFailure::Io(io::Error::other(
                        "pipe reader thread exited without output",
                    )))
                }
            }
        }
        Ok((stdout.unwrap_or_default(), stderr.unwrap_or_default()))
    }
}

impl SegmentationBackend for ExternalSolver {
    fn run(&self, image_path: &Path, seed_text: &str) -> NeedleResult<String> {
        Ok(self.invoke(image_path, seed_text)?)
    }
}

#[derive(Clone, Copy, Debug)]
enum Pipe {
    Stdout,
    Stderr,
}

type PipeText = (Pipe, io::Result<String>);

fn read_pipe<R: Read>(pipe: Option<R>) -> io::Result<String> {
    let mut buf = Vec::new();
    if let Some(mut p) = pipe {
        p.read_to_end(&mut buf)?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// 读到管道关闭后把文本发回. 接收端已放弃时静默丢弃.
fn spawn_reader<R: Read + Send + 'static>(which: Pipe, pipe: Option<R>, tx: Sender<PipeText>) {
    thread::spawn(move || {
        let _ = tx.send((which, read_pipe(pipe)));
    });
}
