pub mod executor;
pub mod program;
pub mod raster;

use std::collections::BTreeMap;

use plotly::common::{Fill, Mode, Title};
use plotly::layout::{Axis, Layout};
use plotly::{Bar, Plot, Scatter};
use serde::Serialize;

/// Pixel size every chart is rasterized at.
pub const IMAGE_WIDTH: usize = 800;
pub const IMAGE_HEIGHT: usize = 500;

/// The four report positions a chart can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ChartSlot {
    Fig1,
    Fig2,
    Fig3,
    Fig4,
}

impl ChartSlot {
    pub const ALL: [ChartSlot; 4] = [ChartSlot::Fig1, ChartSlot::Fig2, ChartSlot::Fig3, ChartSlot::Fig4];

    /// Name the chart program binds this slot to.
    pub fn binding(&self) -> &'static str {
        match self {
            ChartSlot::Fig1 => "fig1",
            ChartSlot::Fig2 => "fig2",
            ChartSlot::Fig3 => "fig3",
            ChartSlot::Fig4 => "fig4",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ChartSlot::Fig1 => "Monthly Ticket Trends",
            ChartSlot::Fig2 => "Issue Categories Breakdown",
            ChartSlot::Fig3 => "Escalation Level Distribution",
            ChartSlot::Fig4 => "SLA Compliance Overview",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ChartSlot::Fig1 => "Ticket volume and resolution over the last six months.",
            ChartSlot::Fig2 => "Most frequent issue categories and their resolution status.",
            ChartSlot::Fig3 => "Tickets by escalation level and status.",
            ChartSlot::Fig4 => "Current month tickets resolved within and outside SLA.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Bar,
    Area,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ChartOrientation {
    #[default]
    Vertical,
    Horizontal,
}

/// One plotted series. `y` is `None` where the source value was null.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartTrace {
    pub name: String,
    pub x: Vec<String>,
    pub y: Vec<Option<f64>>,
}

/// A chart built by the program evaluator. Plain data, so it can cross
/// threads; [`ChartFigure::to_plot`] turns it into a plotly figure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartFigure {
    pub kind: ChartKind,
    pub title: String,
    pub orientation: ChartOrientation,
    pub x_title: Option<String>,
    pub y_title: Option<String>,
    pub traces: Vec<ChartTrace>,
}

impl ChartFigure {
    pub fn to_plot(&self) -> Plot {
        let mut plot = Plot::new();
        let horizontal = self.orientation == ChartOrientation::Horizontal;

        for trace in &self.traces {
            // Horizontal charts put the categories on the y axis
            match self.kind {
                ChartKind::Bar if horizontal => plot.add_trace(
                    Bar::new(trace.y.clone(), trace.x.clone())
                        .name(&trace.name)
                        .orientation(plotly::common::Orientation::Horizontal),
                ),
                ChartKind::Bar => plot.add_trace(Bar::new(trace.x.clone(), trace.y.clone()).name(&trace.name)),
                ChartKind::Line => plot.add_trace(
                    Scatter::new(trace.x.clone(), trace.y.clone())
                        .name(&trace.name)
                        .mode(Mode::LinesMarkers),
                ),
                ChartKind::Area => plot.add_trace(
                    Scatter::new(trace.x.clone(), trace.y.clone())
                        .name(&trace.name)
                        .mode(Mode::Lines)
                        .fill(Fill::ToZeroY),
                ),
            }
        }

        let mut x_axis = Axis::new();
        if let Some(t) = &self.x_title {
            x_axis = x_axis.title(Title::new(t));
        }
        let mut y_axis = Axis::new();
        if let Some(t) = &self.y_title {
            y_axis = y_axis.title(Title::new(t));
        }
        let layout = Layout::new()
            .title(Title::new(&self.title))
            .width(IMAGE_WIDTH)
            .height(IMAGE_HEIGHT)
            .x_axis(x_axis)
            .y_axis(y_axis);
        plot.set_layout(layout);
        plot
    }
}

/// The charts a program produced, keyed by slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSet {
    charts: BTreeMap<ChartSlot, ChartFigure>,
}

impl ChartSet {
    pub fn insert(&mut self, slot: ChartSlot, figure: ChartFigure) {
        self.charts.insert(slot, figure);
    }

    pub fn get(&self, slot: ChartSlot) -> Option<&ChartFigure> {
        self.charts.get(&slot)
    }

    /// Filled slots in report order.
    pub fn iter(&self) -> impl Iterator<Item = (ChartSlot, &ChartFigure)> {
        self.charts.iter().map(|(slot, fig)| (*slot, fig))
    }

    pub fn slots(&self) -> Vec<ChartSlot> {
        self.charts.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }
}

/// A chart rasterized for embedding in the report documents.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartImage {
    pub slot: ChartSlot,
    pub title: String,
    pub png: Vec<u8>,
}
