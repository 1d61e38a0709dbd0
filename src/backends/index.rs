//! Asynchronous search-index backend
//!
//! Each accepted event is turned into a JSON document and handed to an
//! [`IndexClient`] on a [`Dispatcher`] worker. The logging thread only
//! registers the delivery with the logger's [`DispatchCounter`] and enqueues
//! it; [`Logger::flush`] waits on a [`DrainBarrier`] until every accepted
//! delivery has finished. Deliveries run concurrently, so documents may reach
//! the index out of order.

use super::{Clock, NoopLogger};
use crate::core::{
    can_log, Context, DispatchCounter, Dispatcher, DispatcherConfig, DrainBarrier, Field, Handle,
    Level, Logger, LoggerError, Result, SharedLogger,
};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use std::fmt;
use std::io::Write;
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

/// Index used when no name builder is configured
pub const DEFAULT_INDEX_NAME: &str = "logs";

/// Sends one serialized document to an index
pub trait IndexClient: Send + Sync {
    fn index(&self, index: &str, document: &[u8]) -> Result<()>;
}

/// Chooses the target index for an event
pub type IndexNameBuilder = Arc<dyn Fn(&IndexEvent<'_>) -> String + Send + Sync>;

/// What an [`IndexNameBuilder`] sees of an event
#[derive(Debug)]
pub struct IndexEvent<'a> {
    pub level: Level,
    pub name: &'a str,
    pub message: &'a str,
    pub fields: &'a [Field],
}

/// Backend indexing every accepted event as a JSON document
///
/// Every derived logger (`named`, `with`, `clone_logger`) tracks its own
/// deliveries, so flushing one never waits on another's pending work.
pub struct IndexLogger {
    handle: Handle,
    threshold: Level,
    index_name: IndexNameBuilder,
    client: Arc<dyn IndexClient>,
    dispatcher: Arc<Dispatcher>,
    counter: Arc<DispatchCounter>,
    barrier: DrainBarrier,
    diagnostics: SharedLogger,
    clock: Clock,
}

impl IndexLogger {
    pub fn builder(client: Arc<dyn IndexClient>) -> IndexLoggerBuilder {
        IndexLoggerBuilder::new(client)
    }

    pub fn threshold(&self) -> Level {
        self.threshold
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Accepted deliveries that have not finished yet
    pub fn pending(&self) -> usize {
        self.counter.pending()
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    fn derive(&self, handle: Handle) -> Self {
        Self {
            handle,
            threshold: self.threshold,
            index_name: Arc::clone(&self.index_name),
            client: Arc::clone(&self.client),
            dispatcher: Arc::clone(&self.dispatcher),
            counter: DispatchCounter::new(),
            barrier: self.barrier,
            diagnostics: Arc::clone(&self.diagnostics),
            clock: Arc::clone(&self.clock),
        }
    }

    /// Accept one event and queue its delivery
    fn log_async(&self, ctx: &Context, level: Level, message: &str, fields: &[Field]) {
        let guard = self.counter.accept();
        let timestamp = (self.clock)();
        let delivery = Delivery {
            handle: self.handle.clone(),
            level,
            message: message.to_string(),
            fields: fields.to_vec(),
            timestamp,
            ctx: ctx.clone(),
            index_name: Arc::clone(&self.index_name),
            client: Arc::clone(&self.client),
            diagnostics: Arc::clone(&self.diagnostics),
        };

        let submitted = self.dispatcher.submit(Box::new(move || {
            delivery.run();
            guard.complete();
        }));

        if let Err(e) = submitted {
            self.diagnostics
                .warning(ctx, "Dropped log delivery", &[Field::error(&e)]);
        }
    }
}

/// Everything one queued delivery needs, detached from the logger
struct Delivery {
    handle: Handle,
    level: Level,
    message: String,
    fields: Vec<Field>,
    timestamp: DateTime<Utc>,
    ctx: Context,
    index_name: IndexNameBuilder,
    client: Arc<dyn IndexClient>,
    diagnostics: SharedLogger,
}

impl Delivery {
    fn run(&self) {
        let document = match build_document(
            &self.handle,
            self.level,
            &self.message,
            &self.fields,
            self.timestamp,
            &*self.diagnostics,
            &self.ctx,
        ) {
            Ok(document) => document,
            Err(e) => {
                self.diagnostics
                    .error(&self.ctx, "Failed to build body", &[Field::error(&e)]);
                return;
            }
        };

        let name = self.handle.name();
        let index = (self.index_name)(&IndexEvent {
            level: self.level,
            name: &name,
            message: &self.message,
            fields: &self.fields,
        });

        match self.client.index(&index, &document) {
            Ok(()) => self.diagnostics.debug(
                &self.ctx,
                "Index request succeeded",
                &[Field::new("index", index)],
            ),
            Err(e) => self.diagnostics.error(
                &self.ctx,
                "Failed to index document",
                &[Field::new("index", index), Field::error(&e)],
            ),
        }
    }
}

/// Serialize one event into its index document
///
/// Layout: `timestamp`, `level`, `message` and `name` (both omitted when
/// empty), accumulated handle fields at the top level, and call fields under
/// `data`. A handle field colliding with an existing key overwrites it and is
/// reported on `diagnostics`.
pub fn build_document(
    handle: &Handle,
    level: Level,
    message: &str,
    fields: &[Field],
    timestamp: DateTime<Utc>,
    diagnostics: &dyn Logger,
    ctx: &Context,
) -> Result<Vec<u8>> {
    let mut payload = serde_json::Map::new();
    payload.insert(
        "timestamp".to_string(),
        timestamp.to_rfc3339_opts(SecondsFormat::Secs, true).into(),
    );
    payload.insert("level".to_string(), level.to_str().into());
    if !message.is_empty() {
        payload.insert("message".to_string(), message.into());
    }
    let name = handle.name();
    if !name.is_empty() {
        payload.insert("name".to_string(), name.into());
    }

    for field in handle.fields().iter() {
        if payload.contains_key(&field.key) {
            diagnostics.warning(
                ctx,
                "Field already exists in payload, overwriting",
                &[Field::new("key", field.key.as_str())],
            );
        }
        payload.insert(field.key.clone(), field.value.to_json_value());
    }

    if !fields.is_empty() {
        let data: serde_json::Map<String, serde_json::Value> = fields
            .iter()
            .map(|field| (field.key.clone(), field.value.to_json_value()))
            .collect();
        payload.insert("data".to_string(), serde_json::Value::Object(data));
    }

    Ok(serde_json::to_vec(&serde_json::Value::Object(payload))?)
}

impl Logger for IndexLogger {
    fn type_tag(&self) -> &str {
        "index"
    }

    fn named(&self, segment: &str) -> SharedLogger {
        Arc::new(self.derive(self.handle.named(segment)))
    }

    fn with(&self, fields: &[Field]) -> SharedLogger {
        Arc::new(self.derive(self.handle.with(fields)))
    }

    fn clone_logger(&self) -> SharedLogger {
        Arc::new(self.derive(self.handle.clone()))
    }

    fn log(&self, ctx: &Context, level: Level, message: &str, fields: &[Field]) {
        if can_log(self.threshold, level) {
            self.log_async(ctx, level, message, fields);
        }
    }

    fn flush(&self, ctx: &Context) -> Result<()> {
        self.diagnostics.debug(ctx, "Flushing index", &[]);
        self.barrier.wait(&self.counter, ctx, &*self.diagnostics)
    }
}

impl fmt::Debug for IndexLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexLogger")
            .field("name", &self.handle.name())
            .field("threshold", &self.threshold)
            .field("pending", &self.pending())
            .field("barrier", &self.barrier)
            .finish()
    }
}

/// Builder for [`IndexLogger`]
pub struct IndexLoggerBuilder {
    client: Arc<dyn IndexClient>,
    name: Option<String>,
    fields: Vec<Field>,
    threshold: Level,
    index_name: IndexNameBuilder,
    dispatcher: Option<Arc<Dispatcher>>,
    dispatcher_config: DispatcherConfig,
    barrier: DrainBarrier,
    diagnostics: Option<SharedLogger>,
    clock: Clock,
}

impl IndexLoggerBuilder {
    pub fn new(client: Arc<dyn IndexClient>) -> Self {
        Self {
            client,
            name: None,
            fields: Vec::new(),
            threshold: Level::Debug,
            index_name: Arc::new(|_: &IndexEvent<'_>| DEFAULT_INDEX_NAME.to_string()),
            dispatcher: None,
            dispatcher_config: DispatcherConfig::default(),
            barrier: DrainBarrier::default(),
            diagnostics: None,
            clock: Arc::new(Utc::now),
        }
    }

    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    #[must_use]
    pub fn fields(mut self, fields: &[Field]) -> Self {
        self.fields.extend_from_slice(fields);
        self
    }

    #[must_use]
    pub fn threshold(mut self, threshold: Level) -> Self {
        self.threshold = threshold;
        self
    }

    /// Send every document to the same index
    #[must_use]
    pub fn index(mut self, index: impl Into<String>) -> Self {
        let index = index.into();
        self.index_name = Arc::new(move |_: &IndexEvent<'_>| index.clone());
        self
    }

    /// Choose the index per event
    #[must_use]
    pub fn index_name_builder(
        mut self,
        builder: impl Fn(&IndexEvent<'_>) -> String + Send + Sync + 'static,
    ) -> Self {
        self.index_name = Arc::new(builder);
        self
    }

    /// Share an existing dispatcher instead of starting a new one
    #[must_use]
    pub fn dispatcher(mut self, dispatcher: Arc<Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    #[must_use]
    pub fn dispatcher_config(mut self, config: DispatcherConfig) -> Self {
        self.dispatcher_config = config;
        self
    }

    #[must_use]
    pub fn barrier(mut self, barrier: DrainBarrier) -> Self {
        self.barrier = barrier;
        self
    }

    #[must_use]
    pub fn diagnostics(mut self, diagnostics: SharedLogger) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Build the logger, starting a dispatcher unless one was supplied
    pub fn build(self) -> Result<IndexLogger> {
        let dispatcher = match self.dispatcher {
            Some(dispatcher) => dispatcher,
            None => Arc::new(Dispatcher::new(self.dispatcher_config)?),
        };
        let handle = self
            .name
            .as_deref()
            .map(Handle::with_name)
            .unwrap_or_default()
            .with(&self.fields);

        Ok(IndexLogger {
            handle,
            threshold: self.threshold,
            index_name: self.index_name,
            client: self.client,
            dispatcher,
            counter: DispatchCounter::new(),
            barrier: self.barrier,
            diagnostics: self.diagnostics.unwrap_or_else(NoopLogger::shared),
            clock: self.clock,
        })
    }
}

/// [`IndexClient`] writing newline-delimited JSON over TCP
///
/// Each document is sent as `{"index":"<name>","document":{...}}` followed by
/// a newline. A failed write drops the connection, reconnects once and
/// resends.
///
/// ```no_run
/// use fanout_logger::backends::{IndexLogger, TcpIndexClient};
/// use std::sync::Arc;
///
/// let client = TcpIndexClient::connect("127.0.0.1:9300")?;
/// let logger = IndexLogger::builder(Arc::new(client)).index("app-logs").build()?;
/// # Ok::<(), fanout_logger::LoggerError>(())
/// ```
pub struct TcpIndexClient {
    address: String,
    stream: Mutex<Option<TcpStream>>,
    reconnect_on_error: bool,
    timeout: Duration,
}

impl TcpIndexClient {
    /// Connect to `address` (e.g. `"localhost:9300"`)
    pub fn connect(address: impl Into<String>) -> Result<Self> {
        let client = Self {
            address: address.into(),
            stream: Mutex::new(None),
            reconnect_on_error: true,
            timeout: Duration::from_secs(5),
        };
        let stream = client.open()?;
        *client.stream.lock() = Some(stream);
        Ok(client)
    }

    /// Enable or disable one reconnect attempt per failed write
    #[must_use]
    pub fn with_reconnect(mut self, enable: bool) -> Self {
        self.reconnect_on_error = enable;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn open(&self) -> Result<TcpStream> {
        let stream = TcpStream::connect(&self.address)
            .map_err(|e| LoggerError::io_operation("connecting to index", self.address.clone(), e))?;
        // Timeouts keep a stalled server from pinning a dispatch worker
        stream.set_write_timeout(Some(self.timeout))?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    fn encode(index: &str, document: &[u8]) -> Result<Vec<u8>> {
        let mut line = Vec::with_capacity(document.len() + index.len() + 32);
        line.extend_from_slice(b"{\"index\":");
        serde_json::to_writer(&mut line, index)?;
        line.extend_from_slice(b",\"document\":");
        line.extend_from_slice(document);
        line.extend_from_slice(b"}\n");
        Ok(line)
    }
}

impl IndexClient for TcpIndexClient {
    fn index(&self, index: &str, document: &[u8]) -> Result<()> {
        let line = Self::encode(index, document)?;
        let mut stream = self.stream.lock();

        let result = match stream.as_mut() {
            Some(s) => s.write_all(&line).and_then(|()| s.flush()),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "index stream not connected",
            )),
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                *stream = None;
                if !self.reconnect_on_error {
                    return Err(LoggerError::io_operation(
                        "sending document",
                        self.address.clone(),
                        e,
                    ));
                }

                match self.open() {
                    Ok(mut fresh) => {
                        fresh.write_all(&line)?;
                        *stream = Some(fresh);
                        Ok(())
                    }
                    Err(reconnect_err) => Err(LoggerError::writer(format!(
                        "Failed to send document and reconnect: {} (reconnect: {})",
                        e, reconnect_err
                    ))),
                }
            }
        }
    }
}

impl fmt::Debug for TcpIndexClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpIndexClient")
            .field("address", &self.address)
            .field("connected", &self.stream.lock().is_some())
            .finish()
    }
}
