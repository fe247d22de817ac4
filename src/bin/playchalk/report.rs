//! Human-readable summaries printed by the CLI.

use chrono::{TimeZone, Utc};

use playchalk::play::playback::timeline_duration_ms;
use playchalk::{ObjectKind, PlayFile, SavedPlay};

pub fn print_play_info(play: &PlayFile) {
    println!("Play: {}", play.name);
    println!("  Schema version: {}", play.version);
    println!("  Exported at:    {}", play.exported_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!();

    let total_ms = timeline_duration_ms(&play.frames);
    println!("  Frames:   {}", play.frames.len());
    println!("  Runtime:  {:.1} s", total_ms / 1000.0);

    if let Some(first) = play.frames.first() {
        let count = |kind: ObjectKind| first.objects.values().filter(|o| o.kind == kind).count();
        println!(
            "  Tokens:   {} offense, {} defense, {} ball, {} screen, {} cone",
            count(ObjectKind::OffensePlayer),
            count(ObjectKind::DefensePlayer),
            count(ObjectKind::Ball),
            count(ObjectKind::Screen),
            count(ObjectKind::Cone)
        );
    }
    println!();

    println!(
        "  {:>5}  {:>8}  {:>7}  {:>7}  {:>5}  {:>6}",
        "frame", "duration", "tokens", "strokes", "text", "shapes"
    );
    for (i, frame) in play.frames.iter().enumerate() {
        println!(
            "  {:>5}  {:>6}ms  {:>7}  {:>7}  {:>5}  {:>6}",
            i + 1,
            frame.duration,
            frame.objects.len(),
            frame.annotations.len(),
            frame.text_annotations.len(),
            frame.shapes.len()
        );
    }
}

pub fn print_library(plays: &[SavedPlay]) {
    if plays.is_empty() {
        println!("No saved plays.");
        return;
    }
    for play in plays {
        let updated = Utc
            .timestamp_millis_opt(play.updated_at)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "?".to_string());
        let tags = if play.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", play.tags.join(", "))
        };
        println!(
            "{}  {:<24} {:<14} {:>2} frames  {}{}",
            play.id,
            play.name,
            play.category,
            play.frame_count(),
            updated,
            tags
        );
    }
}
