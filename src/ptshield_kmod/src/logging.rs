/*
Copyright 2025 The Ptshield Authors.

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use core::fmt;

use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::{Result, new_error};

/// The module's log level filter.
///
/// The module uses both the `log` and `tracing` crates, and needs each
/// type of `LevelFilter` from both crates. Their discriminants are not
/// guaranteed to agree, so this type converts explicitly to each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ModuleLogFilter {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<ModuleLogFilter> for tracing_core::LevelFilter {
    fn from(filter: ModuleLogFilter) -> Self {
        match filter {
            ModuleLogFilter::Off => tracing_core::LevelFilter::OFF,
            ModuleLogFilter::Error => tracing_core::LevelFilter::ERROR,
            ModuleLogFilter::Warn => tracing_core::LevelFilter::WARN,
            ModuleLogFilter::Info => tracing_core::LevelFilter::INFO,
            ModuleLogFilter::Debug => tracing_core::LevelFilter::DEBUG,
            ModuleLogFilter::Trace => tracing_core::LevelFilter::TRACE,
        }
    }
}

impl From<ModuleLogFilter> for LevelFilter {
    fn from(filter: ModuleLogFilter) -> Self {
        match filter {
            ModuleLogFilter::Off => LevelFilter::Off,
            ModuleLogFilter::Error => LevelFilter::Error,
            ModuleLogFilter::Warn => LevelFilter::Warn,
            ModuleLogFilter::Info => LevelFilter::Info,
            ModuleLogFilter::Debug => LevelFilter::Debug,
            ModuleLogFilter::Trace => LevelFilter::Trace,
        }
    }
}

/// Used when the filter arrives as a module parameter.
impl TryFrom<u64> for ModuleLogFilter {
    type Error = ();

    fn try_from(value: u64) -> core::result::Result<Self, <ModuleLogFilter as TryFrom<u64>>::Error> {
        match value {
            0 => Ok(Self::Off),
            1 => Ok(Self::Error),
            2 => Ok(Self::Warn),
            3 => Ok(Self::Info),
            4 => Ok(Self::Debug),
            5 => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

impl From<ModuleLogFilter> for u64 {
    fn from(value: ModuleLogFilter) -> Self {
        match value {
            ModuleLogFilter::Off => 0,
            ModuleLogFilter::Error => 1,
            ModuleLogFilter::Warn => 2,
            ModuleLogFilter::Info => 3,
            ModuleLogFilter::Debug => 4,
            ModuleLogFilter::Trace => 5,
        }
    }
}

/// The printk level of a `log` level, as in `KERN_ERR` and friends.
/// `log` has no levels above error, and none below debug, so trace
/// shares debug's level.
pub const fn printk_level(level: Level) -> u8 {
    match level {
        Level::Error => 3,
        Level::Warn => 4,
        Level::Info => 6,
        Level::Debug | Level::Trace => 7,
    }
}

/// Where formatted log lines end up, e.g. `printk`.
pub trait LogSink: Send + Sync {
    /// Write one complete line, without a trailing newline.
    fn write_line(&self, line: fmt::Arguments<'_>);
}

/// A `log` backend writing each record as one line to a [`LogSink`],
/// prefixed with its printk level marker.
///
/// Records are filtered against [`log::max_level`] only, so the level a
/// module applies on initialization takes effect in either direction.
pub struct KernelLogger {
    sink: &'static dyn LogSink,
}

impl KernelLogger {
    pub const fn new(sink: &'static dyn LogSink) -> Self {
        Self { sink }
    }

    fn write(&self, record: &Record) {
        self.sink.write_line(format_args!(
            "<{}>{}: {}",
            printk_level(record.level()),
            record.target(),
            record.args()
        ));
    }
}

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.write(record);
        }
    }

    fn flush(&self) {}
}

static LOGGER: spin::Once<KernelLogger> = spin::Once::new();

/// Install the kernel logger. Only the first call has any effect.
pub fn init_logger(sink: &'static dyn LogSink, filter: ModuleLogFilter) -> Result<()> {
    if LOGGER.is_completed() {
        return Ok(());
    }
    let logger = LOGGER.call_once(|| KernelLogger::new(sink));
    log::set_logger(logger).map_err(|e| new_error!("failed to install logger: {}", e))?;
    log::set_max_level(LevelFilter::from(filter));
    Ok(())
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::string::String;
    use alloc::vec::Vec;

    use super::*;

    struct VecSink(spin::Mutex<Vec<String>>);

    impl LogSink for VecSink {
        fn write_line(&self, line: fmt::Arguments<'_>) {
            self.0.lock().push(alloc::format!("{}", line));
        }
    }

    fn leaked_sink() -> &'static VecSink {
        Box::leak(Box::new(VecSink(spin::Mutex::new(Vec::new()))))
    }

    #[test]
    fn test_printk_levels() {
        assert_eq!(printk_level(Level::Error), 3);
        assert_eq!(printk_level(Level::Warn), 4);
        assert_eq!(printk_level(Level::Info), 6);
        assert_eq!(printk_level(Level::Debug), 7);
        assert_eq!(printk_level(Level::Trace), 7);
    }

    #[test]
    fn test_kernel_logger_formats_lines() {
        let sink = leaked_sink();
        let logger = KernelLogger::new(sink);

        logger.write(
            &Record::builder()
                .args(format_args!("vmcall key {:#x}", 0xdead_beef_u64))
                .level(Level::Info)
                .target("ptshield_kmod::handlers")
                .build(),
        );
        logger.write(
            &Record::builder()
                .args(format_args!("stale entry"))
                .level(Level::Trace)
                .target("ptshield_kmod::paging")
                .build(),
        );

        let lines = sink.0.lock();
        assert_eq!(
            *lines,
            [
                "<6>ptshield_kmod::handlers: vmcall key 0xdeadbeef",
                "<7>ptshield_kmod::paging: stale entry",
            ]
        );
    }

    #[test]
    fn test_filter_conversions() {
        for (raw, filter) in [
            (0, ModuleLogFilter::Off),
            (3, ModuleLogFilter::Info),
            (5, ModuleLogFilter::Trace),
        ] {
            assert_eq!(ModuleLogFilter::try_from(raw), Ok(filter));
            assert_eq!(u64::from(filter), raw);
        }
        assert_eq!(ModuleLogFilter::try_from(6), Err(()));
        assert_eq!(LevelFilter::from(ModuleLogFilter::Warn), LevelFilter::Warn);
        assert_eq!(
            tracing_core::LevelFilter::from(ModuleLogFilter::Debug),
            tracing_core::LevelFilter::DEBUG
        );
    }
}
