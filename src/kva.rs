use crate::all::*;

use std::fmt::Write as FmtWrite;

// Import and export of one track as a KVA-style XML fragment. The
// surrounding document writer owns the rest of the file; only the <Track>
// element is produced and consumed here.
//
// Loading is deliberately lossy: unknown elements are skipped with a debug
// log so documents written by newer versions still open, and a fragment that
// cannot produce a usable trajectory comes back with `invalid` set instead
// of an error.

// Remaps a stored timestamp into the current time reference, e.g. after the
// video was trimmed or its frame rate re-measured. The flag is set for
// timestamps that are relative to the track start.
pub type TimestampMapper<'a> = &'a dyn Fn(i64, bool) -> i64;

pub fn write_track_xml(
  track: &Track,
  calibration: &CalibrationHelper,
  timecode: &dyn Fn(i64) -> String,
  out: &mut String,
) -> fmt::Result {
  writeln!(out, "<Track>")?;
  writeln!(out, "  <TimePosition>{}</TimePosition>", track.begin_timestamp)?;
  writeln!(out, "  <Mode>{}</Mode>", track.view.name())?;
  writeln!(out, "  <ExtraData>{}</ExtraData>", track.extra_data.name())?;

  write_track_point_list(track, calibration, timecode, out)?;

  writeln!(out, "  <DrawingStyle>")?;
  let color = track.style.color;
  writeln!(out, "    <Color R=\"{}\" G=\"{}\" B=\"{}\"/>", color.r, color.g, color.b)?;
  writeln!(out, "    <LineSize Value=\"{}\"/>", track.style.line_size)?;
  writeln!(out, "    <TrackShape Value=\"{}\"/>", track.style.shape.name())?;
  writeln!(out, "  </DrawingStyle>")?;

  writeln!(out, "  <MainLabel Text=\"{}\">", escape(&track.label))?;
  write_label(&track.main_label, 2, out)?;
  writeln!(out, "  </MainLabel>")?;

  if !track.keyframe_labels.is_empty() {
    writeln!(out, "  <KeyframeLabelList Count=\"{}\">", track.keyframe_labels.len())?;
    for kl in &track.keyframe_labels {
      writeln!(out, "    <KeyframeLabel>")?;
      write_label(kl, 3, out)?;
      writeln!(out, "    </KeyframeLabel>")?;
    }
    writeln!(out, "  </KeyframeLabelList>")?;
  }

  writeln!(out, "</Track>")
}

fn write_track_point_list(
  track: &Track,
  calibration: &CalibrationHelper,
  timecode: &dyn Fn(i64) -> String,
  out: &mut String,
) -> fmt::Result {
  writeln!(
    out,
    "  <TrackPointList Count=\"{}\" UserUnitLength=\"{}\">",
    track.positions.len(),
    calibration.length_abbreviation(),
  )?;

  if !track.positions.is_empty() {
    // The user coordinate system defaults to the first point unless the
    // user picked an origin.
    let mut origin = track.positions[0].point();
    if calibration.is_origin_set() {
      origin = calibration.coordinates_origin;
    }

    for tp in &track.positions {
      // User units: origin relative, Y up (opposite of the image axis).
      let user_x = calibration.length_in_user_unit((tp.x - origin[0]) as f64);
      let user_y = calibration.length_in_user_unit((origin[1] - tp.y) as f64);
      let user_t = timecode(tp.t);

      // The invariant duplicates keep the fragment field-compatible with
      // writers that emit both the display culture and invariant numbers.
      writeln!(
        out,
        "    <TrackPoint UserX=\"{:.2}\" UserXInvariant=\"{:.2}\" UserY=\"{:.2}\" UserYInvariant=\"{:.2}\" UserTime=\"{}\">{}</TrackPoint>",
        user_x, user_x, user_y, user_y, escape(&user_t), tp.to_text(),
      )?;
    }
  }

  writeln!(out, "  </TrackPointList>")
}

fn write_label(label: &KeyframeLabel, indent: usize, out: &mut String) -> fmt::Result {
  let pad = "  ".repeat(indent);
  let location = label.background().location();
  writeln!(out, "{}<SpacePosition>{};{}</SpacePosition>", pad, location[0], location[1])?;
  writeln!(out, "{}<TimePosition>{}</TimePosition>", pad, label.timestamp)
}

fn escape(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&apos;"),
      _ => out.push(c),
    }
  }
  out
}

// Rebuild a track from its XML fragment. `scale` adapts stored coordinates
// when the image is decoded at another size than it was annotated at. The
// result is flagged `invalid` rather than failing when the fragment cannot
// be used.
pub fn read_track_xml(
  xml: &str,
  scale: Vector2d,
  mapper: Option<TimestampMapper>,
  image_size: Size,
  params: TrackingParams,
) -> Track {
  let mut track = Track::from_size(Pixel::new(0, 0), 0, image_size, params);
  track.invalid = true;

  let mapper = match mapper {
    Some(mapper) => mapper,
    None => {
      debug!("No timestamp mapper provided, track fragment left unparsed.");
      return track;
    },
  };

  let document = match roxmltree::Document::parse(xml) {
    Ok(document) => document,
    Err(err) => {
      debug!("Malformed track fragment: {}", err);
      return track;
    },
  };

  for node in document.root_element().children().filter(|n| n.is_element()) {
    match node.tag_name().name() {
      "TimePosition" => {
        let raw = node.text().unwrap_or("").trim().parse::<i64>().unwrap_or(0);
        track.begin_timestamp = mapper(raw, false);
      },
      "Mode" => {
        let text = node.text().unwrap_or("").trim();
        match TrackView::parse(text) {
          Some(view) => track.view = view,
          None => debug!("Unknown track mode: {}", text),
        }
      },
      "ExtraData" => {
        let text = node.text().unwrap_or("").trim();
        match ExtraData::parse(text) {
          Some(extra_data) => track.extra_data = extra_data,
          None => debug!("Unknown extra data mode: {}", text),
        }
      },
      "TrackPointList" => parse_track_point_list(&node, &mut track, scale, mapper),
      "DrawingStyle" => parse_drawing_style(&node, &mut track),
      "MainLabel" => {
        if let Some(text) = node.attribute("Text") {
          track.label = text.to_string();
        }
        let (location, timestamp) = parse_label(&node, scale);
        if let Some(location) = location {
          track.main_label.set_label_position(location);
        }
        if let Some(timestamp) = timestamp {
          track.main_label.timestamp = timestamp;
        }
      },
      "KeyframeLabelList" => parse_keyframe_label_list(&node, &mut track, scale),
      other => {
        debug!("Unparsed content in KVA XML: {}", other);
      },
    }
  }

  if !track.positions.is_empty() {
    track.end_timestamp =
      track.positions[track.positions.len() - 1].t + track.begin_timestamp;
    let first = track.positions[0].point();
    track.main_label.set_attach(first, false);
    let label = track.label.clone();
    track.main_label.set_text(&label);

    let p0 = &track.positions[0];
    if track.positions.len() > 1 || p0.x != 0 || p0.y != 0 || p0.t != 0 {
      track.invalid = false;
    }
  }

  track
}

fn parse_track_point_list(
  node: &roxmltree::Node,
  track: &mut Track,
  scale: Vector2d,
  mapper: TimestampMapper,
) {
  track.positions.clear();

  for child in node.children().filter(|n| n.is_element()) {
    if child.tag_name().name() == "TrackPoint" {
      let parsed = TrackPoint::from_text(child.text().unwrap_or(""));
      // Coordinates stored at the annotation-time image size, timestamps in
      // relative values; both still need adjusting.
      let adapted = track.tracker.create_orphan_track_point(
        (scale[0] * parsed.x as f64) as i32,
        (scale[1] * parsed.y as f64) as i32,
        mapper(parsed.t, true),
      );
      track.positions.push(adapted);
    }
    else {
      debug!("Unparsed content in KVA XML: {}", child.tag_name().name());
    }
  }
}

fn parse_drawing_style(node: &roxmltree::Node, track: &mut Track) {
  let mut style = track.style;

  for child in node.children().filter(|n| n.is_element()) {
    match child.tag_name().name() {
      "Color" => {
        let channel = |name: &str| {
          child.attribute(name).and_then(|v| v.parse::<u8>().ok())
        };
        if let (Some(r), Some(g), Some(b)) = (channel("R"), channel("G"), channel("B")) {
          style.color = Rgba::new(r, g, b);
        }
      },
      "LineSize" => {
        if let Some(value) = child.attribute("Value").and_then(|v| v.parse::<i32>().ok()) {
          style.line_size = value;
        }
      },
      "TrackShape" => {
        if let Some(shape) = child.attribute("Value").and_then(TrackShape::parse) {
          style.shape = shape;
        }
      },
      other => debug!("Unparsed content in KVA XML: {}", other),
    }
  }

  track.set_style(style);
}

fn parse_keyframe_label_list(node: &roxmltree::Node, track: &mut Track, scale: Vector2d) {
  track.keyframe_labels.clear();

  for child in node.children().filter(|n| n.is_element()) {
    if child.tag_name().name() != "KeyframeLabel" {
      debug!("Unparsed content in KVA XML: {}", child.tag_name().name());
      continue;
    }
    if track.positions.is_empty() {
      continue;
    }

    let (location, timestamp) = parse_label(&child, scale);
    let timestamp = timestamp.unwrap_or(0);

    // Match the label back to the closest of the points read earlier.
    let attach_index = track.find_closest_point(timestamp);
    let mut kl = KeyframeLabel::new(track.positions[attach_index].point(), Rgba::BLACK);
    kl.timestamp = timestamp;
    kl.attach_index = attach_index;
    if let Some(location) = location {
      kl.set_label_position(location);
    }
    track.keyframe_labels.push(kl);
  }
}

fn parse_label(node: &roxmltree::Node, scale: Vector2d) -> (Option<Pixel>, Option<i64>) {
  let mut location = None;
  let mut timestamp = None;

  for child in node.children().filter(|n| n.is_element()) {
    match child.tag_name().name() {
      "SpacePosition" => {
        let text = child.text().unwrap_or("");
        let mut split = text.split(';');
        let x = split.next().and_then(|v| v.trim().parse::<i32>().ok());
        let y = split.next().and_then(|v| v.trim().parse::<i32>().ok());
        if let (Some(x), Some(y)) = (x, y) {
          location = Some(Pixel::new(
            (scale[0] * x as f64) as i32,
            (scale[1] * y as f64) as i32,
          ));
        }
      },
      "TimePosition" => {
        timestamp = child.text().unwrap_or("").trim().parse::<i64>().ok();
      },
      other => debug!("Unparsed content in KVA XML: {}", other),
    }
  }

  (location, timestamp)
}
