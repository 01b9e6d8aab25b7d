use std::sync::{Arc, Mutex};

/// Line-oriented sink shared by the consumer pipeline and the producer client.
pub trait Logger: Send + Sync {
    fn info(&self, line: &str);
    fn error(&self, line: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Consumer,
    Producer,
}

/// Forwards lines to `tracing` under the `consumer` or `producers` target.
#[derive(Debug, Clone, Copy)]
pub struct TracingLogger {
    role: Role,
}

impl TracingLogger {
    pub fn consumer() -> Self { Self { role: Role::Consumer } }
    pub fn producer() -> Self { Self { role: Role::Producer } }
    pub fn role(&self) -> Role { self.role }
}

impl Logger for TracingLogger {
    fn info(&self, line: &str) {
        match self.role {
            Role::Consumer => tracing::info!(target: "consumer", "{}", line),
            Role::Producer => tracing::info!(target: "producers", "{}", line),
        }
    }

    fn error(&self, line: &str) {
        match self.role {
            Role::Consumer => tracing::error!(target: "consumer", "{}", line),
            Role::Producer => tracing::error!(target: "producers", "{}", line),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}

/// Keeps every line in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl MemoryLogger {
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.lines().iter().any(|(l, line)| *l == level && line.contains(needle))
    }

    fn push(&self, level: LogLevel, line: &str) {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).push((level, line.to_string()));
    }
}

impl Logger for MemoryLogger {
    fn info(&self, line: &str) { self.push(LogLevel::Info, line) }
    fn error(&self, line: &str) { self.push(LogLevel::Error, line) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_logger_keeps_order_and_level() {
        let logger = MemoryLogger::new();
        logger.info("first");
        logger.error("second");
        assert_eq!(
            logger.lines(),
            vec![(LogLevel::Info, "first".to_string()), (LogLevel::Error, "second".to_string())]
        );
        assert!(logger.contains(LogLevel::Error, "sec"));
        assert!(!logger.contains(LogLevel::Info, "sec"));
    }

    #[test]
    fn tracing_logger_is_usable_without_a_subscriber() {
        let logger: Arc<dyn Logger> = Arc::new(TracingLogger::producer());
        logger.info("no subscriber installed");
        logger.error("still fine");
        assert_eq!(TracingLogger::consumer().role(), Role::Consumer);
    }
}
