use std::sync::Arc;

use playback_api::{Dispatch, RecordSource};
use playback_engine::{Jitter, PlaybackReport, Scheduler};
use sink_stdout::StdoutSink;
use sink_tcp::TcpSink;
use source_avro::AvroSource;
use source_csv::CsvSource;
use source_json::JsonSource;

use super::config::{Effective, FileKind, SinkTarget};
use super::error::CliError;

// ═══════════════════════════════════════════════════════════════
//  Main dispatch
// ═══════════════════════════════════════════════════════════════

pub async fn run(eff: &Effective) -> Result<PlaybackReport, CliError> {
    play(eff, build_sink(eff)).await
}

async fn play(eff: &Effective, sink: Arc<dyn Dispatch>) -> Result<PlaybackReport, CliError> {
    let mut source = open_source(eff)?;
    let mut scheduler = Scheduler::new(eff.mode).with_jitter(Jitter::from_seed(eff.seed));

    tracing::info!(
        mode = %eff.mode,
        input = %eff.input.display(),
        sink = %eff.sink,
        "starting playback"
    );

    let report = scheduler.play(source.as_mut(), sink).await?;

    tracing::info!(
        dispatched = report.dispatched,
        window_advances = report.window_advances,
        elapsed = ?report.elapsed,
        "playback stopped"
    );
    Ok(report)
}

fn open_source(eff: &Effective) -> Result<Box<dyn RecordSource>, CliError> {
    let ts = eff.ts.clone();
    let source: Box<dyn RecordSource> = match eff.file_kind {
        FileKind::Csv => Box::new(CsvSource::open(&eff.input, ts, eff.csv.clone())?),
        FileKind::Json => Box::new(JsonSource::open(&eff.input, ts)?),
        FileKind::Avro => Box::new(AvroSource::open(&eff.input, ts)?),
    };
    Ok(source)
}

fn build_sink(eff: &Effective) -> Arc<dyn Dispatch> {
    match &eff.sink {
        SinkTarget::Stdout => Arc::new(StdoutSink::new()),
        SinkTarget::Tcp { addr } => Arc::new(TcpSink::new(addr.clone(), eff.timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use std::time::Duration;

    use playback_engine::Mode;
    use source_csv::CsvOptions;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn effective(file: &tempfile::NamedTempFile, kind: FileKind, mode: Mode, column: Option<&str>) -> Effective {
        Effective {
            mode,
            input: file.path().to_path_buf(),
            file_kind: kind,
            ts: column.map(playback_api::TimestampField::new),
            timeout: Duration::from_secs(1),
            seed: 1,
            sink: SinkTarget::Stdout,
            csv: CsvOptions::default(),
        }
    }

    fn lines(buf: &SharedBuf) -> Vec<String> {
        let out = buf.0.lock().unwrap();
        let mut lines: Vec<String> = String::from_utf8_lossy(&out).lines().map(str::to_string).collect();
        lines.sort();
        lines
    }

    #[tokio::test(start_paused = true)]
    async fn replays_csv_relative() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "ts,val\n2019-02-11T15:20:09.514626,foo\n2019-02-11T15:20:10.514626,bar").unwrap();
        let eff = effective(
            &file,
            FileKind::Csv,
            Mode::Relative { lookahead: Duration::from_millis(250), max_jitter_ms: 0 },
            Some("ts"),
        );

        let buf = SharedBuf::default();
        let report = play(&eff, Arc::new(StdoutSink::with_writer(buf.clone()))).await.unwrap();

        assert_eq!(report.dispatched, 2);
        assert_eq!(report.completed, 2);
        assert!(report.window_advances >= 1);
        assert_eq!(
            lines(&buf),
            vec![
                r#"{"ts":"2019-02-11T15:20:09.514626","val":"foo"}"#.to_string(),
                r#"{"ts":"2019-02-11T15:20:10.514626","val":"bar"}"#.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn replays_json_instant() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, r#"{{"ts":"2019-02-11T15:20:09.514626Z","val":"foo"}}"#).unwrap();
        let eff = effective(&file, FileKind::Json, Mode::Instant, None);

        let buf = SharedBuf::default();
        let report = play(&eff, Arc::new(StdoutSink::with_writer(buf.clone()))).await.unwrap();

        assert_eq!(report.dispatched, 1);
        assert_eq!(lines(&buf), vec![r#"{"ts":"2019-02-11T15:20:09.514626Z","val":"foo"}"#.to_string()]);
    }

    #[tokio::test]
    async fn bad_record_surfaces_after_drain() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, "{{\"ts\":\"2019-02-11T15:20:09\"}}\n{{\"val\":1}}").unwrap();
        let eff = effective(&file, FileKind::Json, Mode::Instant, Some("ts"));

        let buf = SharedBuf::default();
        let err = play(&eff, Arc::new(StdoutSink::with_writer(buf.clone()))).await.unwrap_err();

        assert!(matches!(err, CliError::Playback(_)), "{err}");
        assert!(err.to_string().starts_with("read error at record 2"), "{err}");
        assert_eq!(lines(&buf).len(), 1);
    }

    #[tokio::test]
    async fn missing_input_is_adapter_error() {
        let file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        let mut eff = effective(&file, FileKind::Csv, Mode::Instant, None);
        eff.input = "/definitely/not/here.csv".into();

        let err = play(&eff, Arc::new(StdoutSink::with_writer(SharedBuf::default()))).await.unwrap_err();
        assert!(matches!(err, CliError::Adapter(_)), "{err}");
    }

    #[test]
    fn builds_configured_sink() {
        let file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        let mut eff = effective(&file, FileKind::Csv, Mode::Instant, None);
        eff.sink = SinkTarget::Tcp { addr: "127.0.0.1:1".into() };
        // Lazy connect: building never touches the network.
        let _sink = build_sink(&eff);
    }
}
