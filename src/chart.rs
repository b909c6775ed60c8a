//! Text chart of the candle window with the retracement levels drawn across it.

use ratatui::backend::TestBackend;
use ratatui::buffer::Buffer;
use ratatui::style::{Color, Style};
use ratatui::symbols::Marker;
use ratatui::widgets::{Axis, Block, Chart, Dataset, GraphType, LegendPosition};
use ratatui::Terminal;

use crate::error::{Error, Result};
use crate::helpers::format_price;
use crate::indicators::RetracementLevel;
use crate::models::Candle;

pub const DEFAULT_WIDTH: u16 = 64;
pub const DEFAULT_HEIGHT: u16 = 22;

const LEVEL_COLORS: [Color; 6] = [
    Color::Red,
    Color::Yellow,
    Color::Green,
    Color::Cyan,
    Color::Blue,
    Color::Magenta,
];

/// Rendered chart, one string per terminal row.
#[derive(Debug, Clone)]
pub struct ChartArtifact {
    pub title: String,
    pub lines: Vec<String>,
}

impl ChartArtifact {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

pub fn render_chart(
    candles: &[Candle],
    levels: &[RetracementLevel],
    title: &str,
    width: u16,
    height: u16,
) -> Result<ChartArtifact> {
    let (first, last) = match (candles.first(), candles.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(Error::Render("no candles to draw".to_string())),
    };
    if width < 20 || height < 8 {
        return Err(Error::Render(format!("chart area {width}x{height} is too small")));
    }

    let x_min = first.timestamp as f64;
    let x_max = (last.timestamp as f64).max(x_min + 1.0);

    let closes: Vec<(f64, f64)> = candles
        .iter()
        .map(|c| (c.timestamp as f64, c.close))
        .collect();
    let level_lines: Vec<[(f64, f64); 2]> = levels
        .iter()
        .map(|level| [(x_min, level.price), (x_max, level.price)])
        .collect();

    let (y_min, y_max) = candles
        .iter()
        .map(|c| (c.low, c.high))
        .chain(levels.iter().map(|l| (l.price, l.price)))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (l, h)| {
            (lo.min(l), hi.max(h))
        });
    let pad = ((y_max - y_min) * 0.02).max(y_max.abs() * 1e-6);
    let (y_min, y_max) = (y_min - pad, y_max + pad);

    let mut datasets = vec![Dataset::default()
        .name("close")
        .marker(Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::White))
        .data(&closes)];
    for (i, (level, line)) in levels.iter().zip(level_lines.iter()).enumerate() {
        datasets.push(
            Dataset::default()
                .name(format!("{} {}", level.label(), format_price(level.price)))
                .marker(Marker::Dot)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(LEVEL_COLORS[i % LEVEL_COLORS.len()]))
                .data(line),
        );
    }

    let chart = Chart::new(datasets)
        .block(Block::bordered().title(title.to_string()))
        .legend_position(Some(LegendPosition::TopLeft))
        .hidden_legend_constraints((
            ratatui::layout::Constraint::Percentage(60),
            ratatui::layout::Constraint::Percentage(60),
        ))
        .x_axis(Axis::default().bounds([x_min, x_max]))
        .y_axis(
            Axis::default()
                .bounds([y_min, y_max])
                .labels(vec![format_price(y_min), format_price(y_max)]),
        );

    let mut terminal = Terminal::new(TestBackend::new(width, height))?;
    terminal.draw(|frame| frame.render_widget(chart, frame.area()))?;

    Ok(ChartArtifact {
        title: title.to_string(),
        lines: buffer_lines(terminal.backend().buffer()),
    })
}

fn buffer_lines(buffer: &Buffer) -> Vec<String> {
    let width = buffer.area.width as usize;
    buffer
        .content
        .chunks(width.max(1))
        .map(|row| {
            row.iter()
                .map(|cell| cell.symbol())
                .collect::<String>()
                .trim_end()
                .to_string()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{Swing, STANDARD_RATIOS};

    fn candles() -> Vec<Candle> {
        (0..40)
            .map(|i| {
                let mid = 100.0 + (i as f64 / 4.0).sin() * 10.0;
                Candle::new(i * 3_600_000, mid, mid + 1.0, mid - 1.0, mid, 1.0)
            })
            .collect()
    }

    #[test]
    fn test_render_has_requested_size_and_title() {
        let candles = candles();
        let levels = Swing::from_candles(&candles)
            .unwrap()
            .levels(&STANDARD_RATIOS);
        let artifact = render_chart(&candles, &levels, "BTC 4h", 64, 22).unwrap();

        assert_eq!(artifact.lines.len(), 22);
        assert!(artifact.lines.iter().all(|line| line.chars().count() <= 64));
        assert!(artifact.lines[0].contains("BTC 4h"));
        let braille = '\u{2800}'..='\u{28FF}';
        assert!(artifact.text().chars().any(|c| braille.contains(&c)));
    }

    #[test]
    fn test_empty_window_is_an_error() {
        assert!(matches!(
            render_chart(&[], &[], "empty", 64, 22),
            Err(Error::Render(_))
        ));
    }

    #[test]
    fn test_tiny_area_is_an_error() {
        assert!(render_chart(&candles(), &[], "tiny", 10, 4).is_err());
    }
}
