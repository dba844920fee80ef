//! GPX 1.1 track output
//!
//! One document per diary day: a single `<trk>` holding one `<trkseg>` per
//! route that produced points.

use chrono::NaiveDate;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::diary::Day;
use crate::routing::{Route, TimedPoint};
use crate::{Result, TrackError};

pub const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Days visiting a single place have nothing to draw
#[must_use]
pub fn should_emit(day: &Day) -> bool {
    day.distinct_places().len() > 1
}

/// Serialize a day's routes into a GPX document. Empty routes are skipped.
pub fn to_gpx(date: NaiveDate, routes: &[Route]) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b'\t', 1);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Comment(BytesText::new(&format!(" {date} "))))?;

    let mut gpx = BytesStart::new("gpx");
    gpx.push_attribute(("xmlns", GPX_NAMESPACE));
    gpx.push_attribute(("version", "1.1"));
    gpx.push_attribute(("creator", concat!("lifetrack ", env!("CARGO_PKG_VERSION"))));
    writer.write_event(Event::Start(gpx))?;
    writer.write_event(Event::Start(BytesStart::new("trk")))?;

    for route in routes.iter().filter(|route| !route.is_empty()) {
        writer.write_event(Event::Start(BytesStart::new("trkseg")))?;
        for point in &route.points {
            write_point(&mut writer, point)?;
        }
        writer.write_event(Event::End(BytesEnd::new("trkseg")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("trk")))?;
    writer.write_event(Event::End(BytesEnd::new("gpx")))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| TrackError::parse(format!("GPX output is not valid UTF-8: {e}")))
}

fn write_point(writer: &mut Writer<Vec<u8>>, point: &TimedPoint) -> Result<()> {
    let lat = point.point.lat.to_string();
    let lon = point.point.lng.to_string();

    let mut trkpt = BytesStart::new("trkpt");
    trkpt.push_attribute(("lat", lat.as_str()));
    trkpt.push_attribute(("lon", lon.as_str()));
    writer.write_event(Event::Start(trkpt))?;

    writer.write_event(Event::Start(BytesStart::new("time")))?;
    let time = point.time.format(TIME_FORMAT).to_string();
    writer.write_event(Event::Text(BytesText::new(&time)))?;
    writer.write_event(Event::End(BytesEnd::new("time")))?;

    writer.write_event(Event::End(BytesEnd::new("trkpt")))?;
    Ok(())
}

/// Write `<dir>/<date>.gpx`, replacing any previous file for that date
pub fn write_track_file(dir: &Path, date: NaiveDate, routes: &[Route]) -> Result<PathBuf> {
    let document = to_gpx(date, routes)?;
    let path = dir.join(format!("{date}.gpx"));
    fs::write(&path, document)?;

    debug!("Wrote {}", path.display());
    Ok(path)
}
