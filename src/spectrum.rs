//! The loaded spectrum and the fitting session built around it.
//!
//! [`SpectrumModel`] is the seam between display units and the fitters:
//! selections arrive in whatever unit the axis is shown in, are stored in
//! frequency (Hz), and results are converted back on the way out.

use serde::{Deserialize, Serialize};

use crate::axis::{AxisConverter, LinearWcs};
use crate::baseline::{BaselineFit, BaselineFitter};
use crate::error::{Result, SpecFitError};
use crate::gaussian::{GaussianFitResult, GaussianFitter, GaussianGuess, GaussianParams};
use crate::header::{Header, HeaderValue};
use crate::units::Unit;

/// Baseline order used until one is requested explicitly.
pub const DEFAULT_BASELINE_ORDER: usize = 2;

/// One loaded spectrum: frequency axis (Hz), data values and header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    x: Vec<f64>,
    y: Vec<f64>,
    header: Header,
}

impl Spectrum {
    /// Create a spectrum. `x` must be finite and strictly monotonic, in
    /// either direction, and `y` must have the same length.
    pub fn new(x: Vec<f64>, y: Vec<f64>, header: Header) -> Result<Self> {
        if x.len() != y.len() {
            return Err(SpecFitError::DimensionMismatch(format!(
                "x has {} values, y has {}",
                x.len(),
                y.len()
            )));
        }
        if x.is_empty() {
            return Err(SpecFitError::InvalidInput("spectrum is empty".to_string()));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(SpecFitError::InvalidInput(
                "spectrum contains non-finite values".to_string(),
            ));
        }
        let ascending = x.windows(2).all(|w| w[0] < w[1]);
        let descending = x.windows(2).all(|w| w[0] > w[1]);
        if !(ascending || descending) {
            return Err(SpecFitError::InvalidInput(
                "spectral axis is not strictly monotonic".to_string(),
            ));
        }
        Ok(Self { x, y, header })
    }

    /// Build the frequency axis of `y` from the linear WCS of axis 1.
    ///
    /// Pixels `1..=N` are mapped through `CRVAL1 + (pixel - CRPIX1) * CDELT1`.
    /// When `NAXIS1` is present it must equal `y.len()`.
    pub fn from_header(y: Vec<f64>, header: Header) -> Result<Self> {
        if let Some(naxis) = header.float("NAXIS1") {
            if naxis != y.len() as f64 {
                return Err(SpecFitError::DimensionMismatch(format!(
                    "NAXIS1 is {} but {} data values were given",
                    naxis,
                    y.len()
                )));
            }
        }
        let x = LinearWcs::from_header(&header, 1)?.frequency_axis(y.len());
        Self::new(x, y, header)
    }

    /// Frequency of every channel, Hz.
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Number of channels.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Always false; an empty spectrum cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn is_ascending(&self) -> bool {
        self.x.len() < 2 || self.x[0] < self.x[1]
    }
}

/// Where a session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitState {
    /// No spectrum loaded.
    Empty,
    /// Spectrum loaded, no baseline.
    Loaded,
    BaselineFitted,
    GaussianFitted,
}

/// Fitting session over one loaded spectrum.
///
/// Mutating methods take `&mut self`, so a model has a single writer; read
/// queries may be shared freely. Loading a spectrum discards every
/// selection and fit of the previous one.
#[derive(Debug, Clone)]
pub struct SpectrumModel {
    spectrum: Option<Spectrum>,
    converter: Option<AxisConverter>,
    baseline_fitter: BaselineFitter,
    gaussian_fitter: GaussianFitter,

    /// Anchors in Hz.
    anchors: Vec<(f64, f64)>,
    /// Guesses in Hz, x bounds ascending.
    guesses: Vec<GaussianGuess>,
    /// Units the selections were drawn in; results go back out in them.
    anchor_unit: Unit,
    guess_unit: Unit,

    baseline_order: usize,
    gaussian_count: Option<usize>,

    baseline: Option<BaselineFit>,
    gaussian: Option<GaussianFitResult>,
    state: FitState,
}

impl Default for SpectrumModel {
    fn default() -> Self {
        Self::with_fitter(GaussianFitter::default())
    }
}

impl SpectrumModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a model that fits lines with the given fitter (configuration,
    /// cancellation token).
    pub fn with_fitter(gaussian_fitter: GaussianFitter) -> Self {
        Self {
            spectrum: None,
            converter: None,
            baseline_fitter: BaselineFitter::new(),
            gaussian_fitter,
            anchors: Vec::new(),
            guesses: Vec::new(),
            anchor_unit: Unit::Hz,
            guess_unit: Unit::Hz,
            baseline_order: DEFAULT_BASELINE_ORDER,
            gaussian_count: None,
            baseline: None,
            gaussian: None,
            state: FitState::Empty,
        }
    }

    /// Load a spectrum with its frequency axis in Hz.
    ///
    /// On success the model is `Loaded` with no selections or fits. On
    /// failure the previous session is left untouched.
    pub fn load_spectrum(&mut self, x: Vec<f64>, y: Vec<f64>, header: Header) -> Result<()> {
        let spectrum = Spectrum::new(x, y, header)?;
        self.install(spectrum);
        Ok(())
    }

    /// Load a spectrum whose axis is derived from the header WCS.
    pub fn load_from_header(&mut self, y: Vec<f64>, header: Header) -> Result<()> {
        let spectrum = Spectrum::from_header(y, header)?;
        self.install(spectrum);
        Ok(())
    }

    fn install(&mut self, spectrum: Spectrum) {
        log::info!(
            "loaded spectrum with {} channels ({} header keywords)",
            spectrum.len(),
            spectrum.header().len()
        );
        self.converter = Some(AxisConverter::from_header(spectrum.header()));
        self.spectrum = Some(spectrum);
        self.anchors.clear();
        self.guesses.clear();
        self.anchor_unit = Unit::Hz;
        self.guess_unit = Unit::Hz;
        self.baseline = None;
        self.gaussian = None;
        self.state = FitState::Loaded;
    }

    pub fn state(&self) -> FitState {
        self.state
    }

    pub fn spectrum(&self) -> Option<&Spectrum> {
        self.spectrum.as_ref()
    }

    /// Converter bound to the loaded header.
    pub fn converter(&self) -> Option<&AxisConverter> {
        self.converter.as_ref()
    }

    fn loaded(&self) -> Result<(&Spectrum, &AxisConverter)> {
        match (&self.spectrum, &self.converter) {
            (Some(spectrum), Some(converter)) => Ok((spectrum, converter)),
            _ => Err(SpecFitError::InvalidState(
                "no spectrum loaded".to_string(),
            )),
        }
    }

    /// Spectral axis in a display unit.
    pub fn axis_values(&self, unit: Unit) -> Result<Vec<f64>> {
        let (spectrum, converter) = self.loaded()?;
        converter.convert_all(spectrum.x(), Unit::Hz, unit)
    }

    /// Data values as loaded.
    pub fn raw_values(&self) -> Result<&[f64]> {
        Ok(self.loaded()?.0.y())
    }

    /// Data minus the fitted baseline, or the raw data when no baseline is
    /// fitted.
    pub fn subtracted_values(&self) -> Result<Vec<f64>> {
        let (spectrum, _) = self.loaded()?;
        Ok(match &self.baseline {
            Some(baseline) => spectrum
                .y()
                .iter()
                .zip(baseline.values.iter())
                .map(|(y, b)| y - b)
                .collect(),
            None => spectrum.y().to_vec(),
        })
    }

    /// Pass-through header metadata.
    pub fn header_field(&self, key: &str) -> Option<&HeaderValue> {
        self.spectrum.as_ref()?.header().get(key)
    }

    /// Replace the baseline anchors. `points` are `(x, y)` with `x` in
    /// `unit`, which also becomes the unit baseline results are reported
    /// in. The current fit is kept until the next baseline request.
    pub fn set_baseline_anchors(&mut self, points: &[(f64, f64)], unit: Unit) -> Result<()> {
        let (_, converter) = self.loaded()?;
        let anchors = points
            .iter()
            .map(|&(x, y)| Ok((converter.to_frequency(x, unit)?, y)))
            .collect::<Result<Vec<_>>>()?;
        self.anchors = anchors;
        self.anchor_unit = unit;
        Ok(())
    }

    /// Stored anchors converted to `unit`.
    pub fn baseline_anchors(&self, unit: Unit) -> Result<Vec<(f64, f64)>> {
        let (_, converter) = self.loaded()?;
        self.anchors
            .iter()
            .map(|&(x, y)| Ok((converter.from_frequency(x, unit)?, y)))
            .collect()
    }

    /// Order of the last baseline request.
    pub fn baseline_order(&self) -> usize {
        self.baseline_order
    }

    /// Fit the stored anchors with a polynomial of `order`.
    ///
    /// The returned fit is expressed in the unit the anchors were given in.
    /// With no anchors the result is unfitted and the model falls back to
    /// `Loaded`. A new baseline invalidates any Gaussian fit. On error
    /// nothing changes.
    pub fn request_baseline_fit(&mut self, order: usize) -> Result<BaselineFit> {
        let (spectrum, converter) = self.loaded()?;
        let (xs, ys): (Vec<f64>, Vec<f64>) = self.anchors.iter().copied().unzip();
        let fit = self.baseline_fitter.fit(&xs, &ys, order, spectrum.x())?;
        let shown = fit.to_unit(converter, self.anchor_unit)?;

        self.baseline_order = order;
        self.gaussian = None;
        if fit.is_fitted() {
            self.baseline = Some(fit);
            self.state = FitState::BaselineFitted;
        } else {
            self.baseline = None;
            self.state = FitState::Loaded;
        }
        Ok(shown)
    }

    /// Re-run the baseline with the last requested order.
    pub fn refit_baseline(&mut self) -> Result<BaselineFit> {
        self.request_baseline_fit(self.baseline_order)
    }

    /// Replace the anchors and fit them in one step.
    pub fn fit_baseline(
        &mut self,
        points: &[(f64, f64)],
        unit: Unit,
        order: usize,
    ) -> Result<BaselineFit> {
        self.set_baseline_anchors(points, unit)?;
        self.request_baseline_fit(order)
    }

    /// Drop the anchors, the baseline and anything fitted on top of it.
    pub fn clear_baseline(&mut self) {
        self.anchors.clear();
        self.baseline = None;
        self.gaussian = None;
        if self.spectrum.is_some() {
            self.state = FitState::Loaded;
        }
    }

    /// Replace the Gaussian guesses, given in `unit` for x and data units
    /// for y. Bounds are stored in ascending order after conversion. Fit
    /// results are reported in `unit` from now on.
    pub fn set_gaussian_guesses(&mut self, guesses: &[GaussianGuess], unit: Unit) -> Result<()> {
        let (_, converter) = self.loaded()?;
        let converted = guesses
            .iter()
            .map(|g| {
                let guess = GaussianGuess::new(
                    converter.to_frequency(g.xmin, unit)?,
                    converter.to_frequency(g.xmax, unit)?,
                    g.ymin,
                    g.ymax,
                );
                Ok(guess.normalized())
            })
            .collect::<Result<Vec<_>>>()?;
        self.guesses = converted;
        self.guess_unit = unit;
        Ok(())
    }

    /// Stored guesses converted to `unit`, x bounds ascending.
    pub fn gaussian_guesses(&self, unit: Unit) -> Result<Vec<GaussianGuess>> {
        let (_, converter) = self.loaded()?;
        self.guesses
            .iter()
            .map(|g| {
                let guess = GaussianGuess::new(
                    converter.from_frequency(g.xmin, unit)?,
                    converter.from_frequency(g.xmax, unit)?,
                    g.ymin,
                    g.ymax,
                );
                Ok(guess.normalized())
            })
            .collect()
    }

    /// Fit only the first `n` guesses, or all of them with `None`.
    pub fn set_gaussian_count(&mut self, count: Option<usize>) {
        self.gaussian_count = count;
    }

    pub fn gaussian_count(&self) -> Option<usize> {
        self.gaussian_count
    }

    /// Fit the stored guesses against the baseline-subtracted data.
    ///
    /// The returned parameters and errors are in the unit the guesses were
    /// given in. Requires a fitted baseline. With no guesses the result has
    /// zero components. On error the previous result and state are kept.
    pub fn request_gaussian_fit(&mut self) -> Result<GaussianFitResult> {
        let (spectrum, converter) = self.loaded()?;
        if self.baseline.is_none() {
            return Err(SpecFitError::InvalidState(
                "fit a baseline before fitting Gaussians".to_string(),
            ));
        }
        let y = self.subtracted_values()?;
        let result = match self.gaussian_count {
            Some(n) => self
                .gaussian_fitter
                .fit_subset(spectrum.x(), &y, &self.guesses, n)?,
            None => self.gaussian_fitter.fit(spectrum.x(), &y, &self.guesses)?,
        };
        let shown = result.to_unit(converter, self.guess_unit)?;

        self.gaussian = Some(result);
        self.state = FitState::GaussianFitted;
        Ok(shown)
    }

    /// Replace the guesses and fit them in one step.
    pub fn fit_gaussians(
        &mut self,
        guesses: &[GaussianGuess],
        unit: Unit,
    ) -> Result<GaussianFitResult> {
        self.set_gaussian_guesses(guesses, unit)?;
        self.request_gaussian_fit()
    }

    /// Drop the guesses and the Gaussian fit, keeping the baseline.
    pub fn clear_gaussians(&mut self) {
        self.guesses.clear();
        self.gaussian = None;
        self.state = match (&self.spectrum, &self.baseline) {
            (None, _) => FitState::Empty,
            (Some(_), Some(_)) => FitState::BaselineFitted,
            (Some(_), None) => FitState::Loaded,
        };
    }

    /// The current baseline expressed in `unit`, `None` when no baseline is
    /// fitted.
    pub fn current_baseline(&self, unit: Unit) -> Result<Option<BaselineFit>> {
        match (&self.baseline, &self.converter) {
            (Some(fit), Some(converter)) => fit.to_unit(converter, unit).map(Some),
            _ => Ok(None),
        }
    }

    /// The current Gaussian fit with parameters and errors in `unit`, `None`
    /// when no fit is available.
    pub fn current_gaussian_result(&self, unit: Unit) -> Result<Option<GaussianFitResult>> {
        match (&self.gaussian, &self.converter) {
            (Some(result), Some(converter)) => result.to_unit(converter, unit).map(Some),
            _ => Ok(None),
        }
    }

    /// Fitted parameters with mean and sigma in `unit`. Sigma is converted
    /// as a width and is always positive.
    pub fn gaussian_params(&self, unit: Unit) -> Result<Vec<GaussianParams>> {
        let (_, converter) = self.loaded()?;
        let result = self.gaussian.as_ref().ok_or_else(|| {
            SpecFitError::InvalidState("no Gaussian fit available".to_string())
        })?;
        result
            .params
            .iter()
            .map(|p| p.to_unit(converter, unit))
            .collect()
    }
}
