//! Extract command: runs the pipeline on one guide and prints its events.

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::PathBuf;

use calbot_core::{Event, Pipeline, render_calendar};
use calbot_server::{GuideFetcher, GuideSource, ServerConfig, guide_url, publication_thursday};
use chrono::{Local, NaiveDate};
use tracing::{debug, info};
use url::Url;

use crate::config::{ClientConfig, OutputFormat};
use crate::error::{ClientError, ClientResult};

/// Where the guide markup comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// The guide for the anchor Thursday on the configured site.
    Current,
    Stdin,
    Url(Url),
    File(PathBuf),
}

impl Source {
    pub fn parse(arg: Option<&str>) -> ClientResult<Self> {
        match arg {
            None => Ok(Self::Current),
            Some("-") => Ok(Self::Stdin),
            Some(arg) if arg.starts_with("http://") || arg.starts_with("https://") => Url::parse(arg)
                .map(Self::Url)
                .map_err(|e| ClientError::Config(format!("invalid URL {}: {}", arg, e))),
            Some(path) => Ok(Self::File(PathBuf::from(path))),
        }
    }
}

/// Extracts events and writes them to stdout.
///
/// Whatever was extracted is printed even when extraction stops early; the
/// error is returned afterwards so the process exits non-zero.
pub async fn run(
    config: &ClientConfig,
    source: Option<String>,
    anchor: Option<NaiveDate>,
    format: Option<OutputFormat>,
) -> ClientResult<()> {
    let server_config = config.to_server_config()?;
    let source = Source::parse(source.as_deref())?;
    let anchor = anchor.unwrap_or_else(|| publication_thursday(Local::now().date_naive()));
    debug!(?source, %anchor, "Extracting guide");

    let reader = open(&source, &server_config, anchor).await?;
    let extraction = Pipeline::new(anchor).extract(reader).await;
    info!(
        events = extraction.events.len(),
        timed = extraction.events.iter().filter(|e| e.is_timed()).count(),
        complete = extraction.is_complete(),
        "Extraction done"
    );

    let format = format.unwrap_or(config.output.format);
    print!("{}", render(&extraction.events, format, &server_config.calendar_name)?);

    match extraction.error {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

async fn open(
    source: &Source,
    config: &ServerConfig,
    anchor: NaiveDate,
) -> ClientResult<Box<dyn BufRead + Send>> {
    let url = match source {
        Source::Stdin => return Ok(Box::new(BufReader::new(std::io::stdin()))),
        Source::File(path) => {
            let file = File::open(path).map_err(|e| {
                ClientError::Config(format!("cannot open {}: {}", path.display(), e))
            })?;
            return Ok(Box::new(BufReader::new(file)));
        }
        Source::Url(url) => url.clone(),
        Source::Current => guide_url(&config.base_url, anchor)?,
    };

    info!(url = %url, "Fetching guide");
    let body = GuideFetcher::new(config)?.fetch(&url).await?;
    Ok(Box::new(Cursor::new(body)))
}

/// Renders events in the requested format.
pub fn render(events: &[Event], format: OutputFormat, calendar_name: &str) -> ClientResult<String> {
    match format {
        OutputFormat::Ics => Ok(render_calendar(events, calendar_name)),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(events)
                .map_err(|e| ClientError::Output(format!("failed to serialize events: {}", e)))?;
            json.push('\n');
            Ok(json)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use calbot_core::DateRange;

    use super::*;

    fn anchor() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 9).unwrap()
    }

    fn guide_file(html: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(html.as_bytes()).unwrap();
        file
    }

    #[test]
    fn source_arguments() {
        assert_eq!(Source::parse(None).unwrap(), Source::Current);
        assert_eq!(Source::parse(Some("-")).unwrap(), Source::Stdin);
        assert_eq!(
            Source::parse(Some("guide.html")).unwrap(),
            Source::File(PathBuf::from("guide.html"))
        );
        assert!(matches!(
            Source::parse(Some("https://example.com/guide/")).unwrap(),
            Source::Url(url) if url.host_str() == Some("example.com")
        ));
        assert!(Source::parse(Some("https://")).is_err());
    }

    #[test]
    fn json_output_lists_events() {
        let events = vec![Event {
            dates: DateRange::single(anchor()),
            times: Vec::new(),
            title: "Trivia Night".into(),
            description: "Join us.".into(),
            link: None,
            location: Some("The Pub".into()),
        }];
        let json = render(&events, OutputFormat::Json, "Guide").unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["title"], "Trivia Night");
        assert_eq!(parsed[0]["location"], "The Pub");
    }

    #[test]
    fn ics_output_is_a_calendar() {
        let ics = render(&[], OutputFormat::Ics, "Guide").unwrap();
        assert!(ics.starts_with("BEGIN:VCALENDAR"));
    }

    #[tokio::test]
    async fn extracts_from_file() {
        let file = guide_file("<h2>Friday, May 10</h2><p><b>Concert</b> 8 p.m.</p>");
        let source = file.path().to_string_lossy().into_owned();
        let result = run(
            &ClientConfig::default(),
            Some(source),
            Some(anchor()),
            Some(OutputFormat::Json),
        )
        .await;
        assert!(result.is_ok(), "{result:?}");
    }

    #[tokio::test]
    async fn incomplete_extraction_is_an_error() {
        let file = guide_file("<h2>Friday, May 10</h2><p><b>Kept</b></p><p><a href=");
        let source = file.path().to_string_lossy().into_owned();
        let result = run(&ClientConfig::default(), Some(source), Some(anchor()), None).await;
        assert!(matches!(result, Err(ClientError::Extract(_))));
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("absent.html").to_string_lossy().into_owned();
        let result = run(&ClientConfig::default(), Some(source), Some(anchor()), None).await;
        assert!(matches!(result, Err(ClientError::Config(msg)) if msg.contains("cannot open")));
    }
}
