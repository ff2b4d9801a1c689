use crate::{GpxError, Track, TrackPoint};
use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;

const TRACK: [&[u8]; 2] = [b"gpx", b"trk"];
const SEGMENT: [&[u8]; 3] = [b"gpx", b"trk", b"trkseg"];
const POINT: [&[u8]; 4] = [b"gpx", b"trk", b"trkseg", b"trkpt"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    TrackName,
    Elevation,
    Time,
}

/// Parses a GPX document into a single flattened [`Track`].
///
/// Every `trk > trkseg > trkpt` is visited in document order and appended to
/// one point sequence; segment and track boundaries are not kept. The first
/// non-empty `trk > name` becomes the track name. Any XML error rejects the
/// whole document.
pub fn parse_gpx(input: &[u8]) -> Result<Track, GpxError> {
    let mut reader = Reader::from_reader(input);
    let mut buf = Vec::new();

    let mut open: Vec<Vec<u8>> = Vec::new();
    let mut seen_root = false;
    let mut track_name = String::new();
    let mut points = Vec::new();

    let mut current: Option<TrackPoint> = None;
    let mut capture: Option<Capture> = None;
    let mut text = String::new();

    loop {
        let event = match reader.read_event_into(&mut buf) {
            Err(e) => return Err(xml_error(&reader, e.to_string())),
            Ok(Event::Eof) => break,
            Ok(event) => event.into_owned(),
        };

        match event {
            Event::Start(ref e) => {
                let local = e.local_name().as_ref().to_vec();
                if open.is_empty() {
                    check_root(&local)?;
                    seen_root = true;
                }
                match local.as_slice() {
                    b"trkpt" if at_path(&open, &SEGMENT) => {
                        current = Some(point_from_attributes(e)?);
                    }
                    b"ele" if at_path(&open, &POINT) && current.is_some() => {
                        capture = Some(Capture::Elevation);
                        text.clear();
                    }
                    b"time" if at_path(&open, &POINT) && current.is_some() => {
                        capture = Some(Capture::Time);
                        text.clear();
                    }
                    b"name" if at_path(&open, &TRACK) && track_name.is_empty() => {
                        capture = Some(Capture::TrackName);
                        text.clear();
                    }
                    _ => {}
                }

                open.push(local);
            }

            Event::Empty(ref e) => {
                let local = e.local_name();
                if open.is_empty() {
                    check_root(local.as_ref())?;
                    seen_root = true;
                }
                // <trkpt lat=".." lon=".."/> has neither elevation nor time
                if local.as_ref() == b"trkpt" && at_path(&open, &SEGMENT) {
                    points.push(point_from_attributes(e)?);
                }
            }

            Event::End(_) => {
                let closed = open.pop().unwrap_or_default();

                if let Some(field) = capture.take() {
                    let value = text.trim();
                    match field {
                        Capture::Elevation => {
                            if let Some(point) = current.as_mut() {
                                point.elevation = parse_elevation(value)?;
                            }
                        }
                        Capture::Time => {
                            // Unparsable timestamps leave the point untimed
                            if let Some(point) = current.as_mut() {
                                point.time = OffsetDateTime::parse(value, &Rfc3339).ok();
                            }
                        }
                        Capture::TrackName => {
                            if !value.is_empty() {
                                track_name = value.to_string();
                            }
                        }
                    }
                } else if closed == b"trkpt"
                    && at_path(&open, &SEGMENT)
                    && let Some(point) = current.take()
                {
                    points.push(point);
                }
            }

            Event::Text(ref e) => {
                if capture.is_some() {
                    let decoded = e
                        .decode()
                        .map_err(|err| xml_error(&reader, err.to_string()))?;
                    text.push_str(&decoded);
                }
            }

            Event::CData(ref e) => {
                if capture.is_some() {
                    let decoded = e
                        .decode()
                        .map_err(|err| xml_error(&reader, err.to_string()))?;
                    text.push_str(&decoded);
                }
            }

            // &amp; and &#39; arrive as their own events between text runs
            Event::GeneralRef(ref e) => {
                if capture.is_some() {
                    let resolved =
                        resolve_reference(e).map_err(|message| xml_error(&reader, message))?;
                    text.push_str(&resolved);
                }
            }

            _ => {}
        }

        buf.clear();
    }

    if let Some(element) = open.pop() {
        return Err(GpxError::UnexpectedEof {
            element: String::from_utf8_lossy(&element).into_owned(),
        });
    }
    if !seen_root {
        return Err(GpxError::Empty);
    }

    debug!(points = points.len(), name = %track_name, "parsed GPX document");

    Ok(Track::new(track_name, points))
}

fn xml_error(reader: &Reader<&[u8]>, message: String) -> GpxError {
    GpxError::Xml {
        position: reader.buffer_position(),
        message,
    }
}

fn at_path(open: &[Vec<u8>], path: &[&[u8]]) -> bool {
    open.iter().map(Vec::as_slice).eq(path.iter().copied())
}

fn resolve_reference(e: &BytesRef) -> Result<String, String> {
    if let Some(ch) = e.resolve_char_ref().map_err(|err| err.to_string())? {
        return Ok(ch.to_string());
    }
    let name = e.decode().map_err(|err| err.to_string())?;
    resolve_predefined_entity(&name)
        .map(str::to_string)
        .ok_or_else(|| format!("unknown entity &{name};"))
}

fn check_root(local: &[u8]) -> Result<(), GpxError> {
    if local == b"gpx" {
        Ok(())
    } else {
        Err(GpxError::NotGpx {
            found: String::from_utf8_lossy(local).into_owned(),
        })
    }
}

fn point_from_attributes(e: &BytesStart) -> Result<TrackPoint, GpxError> {
    let mut lat = None;
    let mut lon = None;

    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"lat" => lat = Some(parse_number("lat", &attr.value)?),
            b"lon" => lon = Some(parse_number("lon", &attr.value)?),
            _ => {}
        }
    }

    let lat = lat.ok_or(GpxError::MissingCoordinate { attribute: "lat" })?;
    let lon = lon.ok_or(GpxError::MissingCoordinate { attribute: "lon" })?;

    Ok(TrackPoint::new(lat, lon, 0.0, None))
}

fn parse_number(field: &'static str, raw: &[u8]) -> Result<f64, GpxError> {
    let value = String::from_utf8_lossy(raw);
    value.trim().parse().map_err(|_| GpxError::InvalidNumber {
        field,
        value: value.into_owned(),
    })
}

fn parse_elevation(value: &str) -> Result<f64, GpxError> {
    if value.is_empty() {
        return Ok(0.0);
    }
    parse_number("ele", value.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const SAMPLE_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test">
  <trk>
    <name>Test Track</name>
    <trkseg>
      <trkpt lat="37.7749" lon="-122.4194">
        <ele>100</ele>
        <time>2023-01-01T10:00:00Z</time>
        <extensions>
          <ns3:TrackPointExtension xmlns:ns3="http://www.garmin.com/xmlschemas/TrackPointExtension/v1">
            <ns3:hr>150</ns3:hr>
          </ns3:TrackPointExtension>
        </extensions>
      </trkpt>
      <trkpt lat="37.7750" lon="-122.4195">
        <ele>101.5</ele>
        <time>2023-01-01T10:00:02Z</time>
      </trkpt>
      <trkpt lat="37.7751" lon="-122.4196">
        <ele>102</ele>
        <time>2023-01-01T10:00:10Z</time>
      </trkpt>
    </trkseg>
  </trk>
</gpx>"#;

    #[test]
    fn test_parse_gpx_reads_points_and_name() {
        let track = parse_gpx(SAMPLE_GPX.as_bytes()).unwrap();

        assert_eq!(track.name(), "Test Track");
        assert_eq!(track.len(), 3);

        let points = track.points();
        assert_eq!(points[0].lat, 37.7749);
        assert_eq!(points[0].lon, -122.4194);
        assert_eq!(points[0].elevation, 100.0);
        assert_eq!(points[0].time, Some(datetime!(2023-01-01 10:00:00 UTC)));
        assert_eq!(points[1].elevation, 101.5);
        assert_eq!(points[2].time, Some(datetime!(2023-01-01 10:00:10 UTC)));
    }

    #[test]
    fn test_parse_gpx_flattens_segments_and_tracks_in_order() {
        let gpx = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test">
  <trk>
    <name>First</name>
    <trkseg>
      <trkpt lat="1.0" lon="1.0"><ele>1</ele></trkpt>
      <trkpt lat="2.0" lon="2.0"><ele>2</ele></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="3.0" lon="3.0"><ele>3</ele></trkpt>
    </trkseg>
  </trk>
  <trk>
    <name>Second</name>
    <trkseg>
      <trkpt lat="4.0" lon="4.0"><ele>4</ele></trkpt>
      <trkpt lat="5.0" lon="5.0"><ele>5</ele></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

        let track = parse_gpx(gpx.as_bytes()).unwrap();
        assert_eq!(track.name(), "First");

        let lats: Vec<f64> = track.points().iter().map(|p| p.lat).collect();
        assert_eq!(lats, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_parse_gpx_uses_first_non_empty_track_name() {
        let gpx = r#"<gpx version="1.1" creator="test">
  <metadata><name>Metadata name</name></metadata>
  <trk>
    <trkseg>
      <trkpt lat="1.0" lon="1.0"><name>Point name</name></trkpt>
    </trkseg>
  </trk>
  <trk>
    <name></name>
  </trk>
  <trk>
    <name>Evening Run</name>
  </trk>
  <trk>
    <name>Ignored</name>
  </trk>
</gpx>"#;

        let track = parse_gpx(gpx.as_bytes()).unwrap();
        assert_eq!(track.name(), "Evening Run");
        assert_eq!(track.len(), 1);
    }

    #[test]
    fn test_parse_gpx_without_name_is_empty() {
        let gpx = r#"<gpx><trk><trkseg><trkpt lat="1" lon="2"/></trkseg></trk></gpx>"#;

        let track = parse_gpx(gpx.as_bytes()).unwrap();
        assert_eq!(track.name(), "");
        assert_eq!(track.len(), 1);
    }

    #[test]
    fn test_parse_gpx_unescapes_track_name() {
        let gpx = r#"<gpx><trk><name>Tom &amp; Jerry&#39;s &lt;Loop&#x3E;</name>
  <trkseg><trkpt lat="1" lon="2"/></trkseg>
</trk></gpx>"#;

        let track = parse_gpx(gpx.as_bytes()).unwrap();
        assert_eq!(track.name(), "Tom & Jerry's <Loop>");
    }

    #[test]
    fn test_parse_gpx_entity_only_name_counts_as_non_empty() {
        let gpx = r#"<gpx>
  <trk><name>&amp;</name></trk>
  <trk><name>Second</name></trk>
</gpx>"#;

        let track = parse_gpx(gpx.as_bytes()).unwrap();
        assert_eq!(track.name(), "&");
    }

    #[test]
    fn test_parse_gpx_unknown_entity_fails() {
        let gpx = r#"<gpx><trk><name>Caf&eacute;</name></trk></gpx>"#;

        let err = parse_gpx(gpx.as_bytes()).unwrap_err();
        assert!(matches!(err, GpxError::Xml { .. }), "got {err:?}");
    }

    #[test]
    fn test_parse_gpx_only_reads_points_under_gpx_trk_trkseg() {
        let gpx = r#"<gpx>
  <extensions>
    <trk>
      <name>Nested</name>
      <trkseg><trkpt lat="9" lon="9"><ele>900</ele></trkpt></trkseg>
    </trk>
  </extensions>
  <trk>
    <name>Top level</name>
    <trkseg>
      <trkpt lat="1" lon="1"><extensions><ele>500</ele></extensions></trkpt>
      <trkpt lat="2" lon="2"/>
    </trkseg>
  </trk>
</gpx>"#;

        let track = parse_gpx(gpx.as_bytes()).unwrap();
        assert_eq!(track.name(), "Top level");

        let lats: Vec<f64> = track.points().iter().map(|p| p.lat).collect();
        assert_eq!(lats, vec![1.0, 2.0]);
        assert_eq!(track.points()[0].elevation, 0.0);
    }

    #[test]
    fn test_parse_gpx_missing_elevation_defaults_to_zero() {
        let gpx = r#"<gpx version="1.1" creator="test">
  <trk>
    <trkseg>
      <trkpt lat="37.7749" lon="-122.4194">
        <time>2023-01-01T10:00:00Z</time>
      </trkpt>
      <trkpt lat="37.7750" lon="-122.4195"/>
      <trkpt lat="37.7751" lon="-122.4196"><ele></ele></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

        let track = parse_gpx(gpx.as_bytes()).unwrap();
        assert_eq!(track.len(), 3);
        assert!(track.points().iter().all(|p| p.elevation == 0.0));
        assert!(track.points()[1].time.is_none());
    }

    #[test]
    fn test_parse_gpx_malformed_time_leaves_point_untimed() {
        let gpx = r#"<gpx version="1.1" creator="test">
  <trk>
    <trkseg>
      <trkpt lat="37.7749" lon="-122.4194">
        <time>invalid-time</time>
      </trkpt>
      <trkpt lat="37.7750" lon="-122.4195">
        <time>2023-01-01T10:00:00Z</time>
      </trkpt>
    </trkseg>
  </trk>
</gpx>"#;

        let track = parse_gpx(gpx.as_bytes()).unwrap();
        assert_eq!(track.len(), 2);
        assert!(track.points()[0].time.is_none());
        assert_eq!(
            track.points()[1].time,
            Some(datetime!(2023-01-01 10:00:00 UTC))
        );
    }

    #[test]
    fn test_parse_gpx_keeps_offsets_and_fractional_seconds() {
        let gpx = r#"<gpx><trk><trkseg>
  <trkpt lat="1" lon="1"><time>2023-06-01T08:30:00.250+02:00</time></trkpt>
</trkseg></trk></gpx>"#;

        let track = parse_gpx(gpx.as_bytes()).unwrap();
        assert_eq!(
            track.points()[0].time,
            Some(datetime!(2023-06-01 06:30:00.25 UTC))
        );
    }

    #[test]
    fn test_parse_gpx_ignores_routes_and_waypoints() {
        let gpx = r#"<gpx version="1.1" creator="test">
  <wpt lat="9.0" lon="9.0"><ele>900</ele></wpt>
  <rte><rtept lat="8.0" lon="8.0"/></rte>
  <trk><trkseg><trkpt lat="1.0" lon="1.0"/></trkseg></trk>
</gpx>"#;

        let track = parse_gpx(gpx.as_bytes()).unwrap();
        assert_eq!(track.len(), 1);
        assert_eq!(track.points()[0].lat, 1.0);
    }

    #[test]
    fn test_parse_gpx_mismatched_tags_fail() {
        let gpx = r#"<gpx><trk><trkseg><trkpt lat="1" lon="1"></trkseg></trk></gpx>"#;

        let err = parse_gpx(gpx.as_bytes()).unwrap_err();
        assert!(matches!(err, GpxError::Xml { .. }), "got {err:?}");
    }

    #[test]
    fn test_parse_gpx_truncated_document_fails() {
        let truncated = &SAMPLE_GPX[..SAMPLE_GPX.len() / 2];

        assert!(parse_gpx(truncated.as_bytes()).is_err());
    }

    #[test]
    fn test_parse_gpx_empty_input_fails() {
        assert_eq!(parse_gpx(b"").unwrap_err(), GpxError::Empty);
        assert_eq!(
            parse_gpx(b"<?xml version=\"1.0\"?>\n").unwrap_err(),
            GpxError::Empty
        );
    }

    #[test]
    fn test_parse_gpx_wrong_root_fails() {
        let err = parse_gpx(b"<kml><Document/></kml>").unwrap_err();
        assert_eq!(
            err,
            GpxError::NotGpx {
                found: "kml".to_string()
            }
        );
    }

    #[test]
    fn test_parse_gpx_invalid_coordinate_fails() {
        let gpx = r#"<gpx><trk><trkseg><trkpt lat="north" lon="1"/></trkseg></trk></gpx>"#;

        let err = parse_gpx(gpx.as_bytes()).unwrap_err();
        assert_eq!(
            err,
            GpxError::InvalidNumber {
                field: "lat",
                value: "north".to_string()
            }
        );
    }

    #[test]
    fn test_parse_gpx_missing_coordinate_fails() {
        let gpx = r#"<gpx><trk><trkseg><trkpt lat="1.5"></trkpt></trkseg></trk></gpx>"#;

        let err = parse_gpx(gpx.as_bytes()).unwrap_err();
        assert_eq!(err, GpxError::MissingCoordinate { attribute: "lon" });
    }

    #[test]
    fn test_parse_gpx_invalid_elevation_fails() {
        let gpx = r#"<gpx><trk><trkseg>
  <trkpt lat="1" lon="1"><ele>high</ele></trkpt>
</trkseg></trk></gpx>"#;

        let err = parse_gpx(gpx.as_bytes()).unwrap_err();
        assert!(matches!(err, GpxError::InvalidNumber { field: "ele", .. }));
    }

    #[test]
    fn test_parse_gpx_with_no_tracks_has_no_points() {
        let track = parse_gpx(br#"<gpx version="1.1" creator="test"></gpx>"#).unwrap();

        assert!(track.is_empty());
        assert_eq!(track.name(), "");
    }
}
