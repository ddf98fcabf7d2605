use crate::charts::ChartFigure;
use crate::error::{Error, Result};

/// Converts a chart to PNG bytes. Called on a blocking thread.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, figure: &ChartFigure, width: usize, height: usize) -> Result<Vec<u8>>;

    /// False when this build has no image backend at all.
    fn is_available(&self) -> bool {
        true
    }
}

/// The rasterizer this build supports.
pub fn default_rasterizer() -> std::sync::Arc<dyn Rasterizer> {
    #[cfg(feature = "kaleido")]
    {
        std::sync::Arc::new(KaleidoRasterizer)
    }
    #[cfg(not(feature = "kaleido"))]
    {
        std::sync::Arc::new(DisabledRasterizer)
    }
}

/// Renders through plotly's kaleido backend via a temporary file.
#[cfg(feature = "kaleido")]
pub struct KaleidoRasterizer;

#[cfg(feature = "kaleido")]
impl Rasterizer for KaleidoRasterizer {
    fn rasterize(&self, figure: &ChartFigure, width: usize, height: usize) -> Result<Vec<u8>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("chart.png");
        figure
            .to_plot()
            .write_image(&path, plotly::ImageFormat::PNG, width, height, 1.0);
        std::fs::read(&path)
            .map_err(|e| Error::Render(format!("kaleido produced no image for {:?}: {e}", figure.title)))
    }
}

/// Used when the crate is built without an image backend; every chart fails
/// to rasterize and the report goes out without images.
pub struct DisabledRasterizer;

impl Rasterizer for DisabledRasterizer {
    fn rasterize(&self, _figure: &ChartFigure, _width: usize, _height: usize) -> Result<Vec<u8>> {
        Err(Error::Render(
            "chart rasterization requires the `kaleido` feature".into(),
        ))
    }

    fn is_available(&self) -> bool {
        false
    }
}
