use crate::error::BuildError;
use bevy_math::FloatExt;
use std::convert::Infallible;

/// Static bounds of a spline coordinate.
pub trait RangeFunction {
    fn min_value(&self) -> f32;

    fn max_value(&self) -> f32;
}

/// Cubic Hermite spline over a coordinate `F`, with nested splines as point values.
#[derive(Debug, Clone, PartialEq)]
pub enum CubicSpline<F> {
    Constant(f32),
    MultiPoint {
        coordinate: F,
        locations: Vec<f32>,
        values: Vec<CubicSpline<F>>,
        derivatives: Vec<f32>,
        min_value: f32,
        max_value: f32,
    },
}

impl<F: RangeFunction> CubicSpline<F> {
    pub fn multipoint(
        coordinate: F,
        locations: Vec<f32>,
        values: Vec<CubicSpline<F>>,
        derivatives: Vec<f32>,
    ) -> Result<Self, BuildError> {
        if locations.is_empty() {
            return Err(BuildError::EmptySpline);
        }
        if locations.len() != values.len() || locations.len() != derivatives.len() {
            return Err(BuildError::MalformedSpline {
                locations: locations.len(),
                values: values.len(),
                derivatives: derivatives.len(),
            });
        }
        let n = locations.len() - 1;
        let mut spline_min = f32::INFINITY;
        let mut spline_max = f32::NEG_INFINITY;

        let coordinate_min = coordinate.min_value();
        let coordinate_max = coordinate.max_value();
        if coordinate_min < locations[0] {
            let extend_min = linear_extend(
                coordinate_min,
                &locations,
                values[0].min_value(),
                &derivatives,
                0,
            );
            let extend_max = linear_extend(
                coordinate_min,
                &locations,
                values[0].max_value(),
                &derivatives,
                0,
            );
            spline_min = spline_min.min(extend_min.min(extend_max));
            spline_max = spline_max.max(extend_min.max(extend_max));
        }
        if coordinate_max > locations[n] {
            let extend_min = linear_extend(
                coordinate_max,
                &locations,
                values[n].min_value(),
                &derivatives,
                n,
            );
            let extend_max = linear_extend(
                coordinate_max,
                &locations,
                values[n].max_value(),
                &derivatives,
                n,
            );
            spline_min = spline_min.min(extend_min.min(extend_max));
            spline_max = spline_max.max(extend_min.max(extend_max));
        }
        for value in &values {
            spline_min = spline_min.min(value.min_value());
            spline_max = spline_max.max(value.max_value());
        }
        for i in 0..n {
            let location_delta = locations[i + 1] - locations[i];
            let min_left = values[i].min_value();
            let max_left = values[i].max_value();
            let min_right = values[i + 1].min_value();
            let max_right = values[i + 1].max_value();
            let derivative_left = derivatives[i];
            let derivative_right = derivatives[i + 1];
            if derivative_left != 0.0 || derivative_right != 0.0 {
                let max_value_delta_left = derivative_left * location_delta;
                let max_value_delta_right = derivative_right * location_delta;
                let min_value = min_left.min(min_right);
                let max_value = max_left.max(max_right);
                let min_delta_left = max_value_delta_left - max_right + min_left;
                let max_delta_left = max_value_delta_left - min_right + max_left;
                let min_delta_right = -max_value_delta_right + min_right - max_left;
                let max_delta_right = -max_value_delta_right + max_right - min_left;
                let min_delta = min_delta_left.min(min_delta_right);
                let max_delta = max_delta_left.max(max_delta_right);
                spline_min = spline_min.min(min_value + 0.25 * min_delta);
                spline_max = spline_max.max(max_value + 0.25 * max_delta);
            }
        }
        Ok(CubicSpline::MultiPoint {
            coordinate,
            locations,
            values,
            derivatives,
            min_value: spline_min,
            max_value: spline_max,
        })
    }

    /// Rebuilds the spline with every coordinate rewritten, recomputing bounds.
    pub fn try_map_all<G, E, V>(&self, visitor: &mut V) -> Result<CubicSpline<G>, E>
    where
        G: RangeFunction,
        E: From<BuildError>,
        V: FnMut(&F) -> Result<G, E>,
    {
        match self {
            CubicSpline::Constant(v) => Ok(CubicSpline::Constant(*v)),
            CubicSpline::MultiPoint {
                coordinate,
                locations,
                values,
                derivatives,
                ..
            } => {
                let coordinate = visitor(coordinate)?;
                let values = values
                    .iter()
                    .map(|v| v.try_map_all(visitor))
                    .collect::<Result<Vec<_>, E>>()?;
                Ok(CubicSpline::multipoint(
                    coordinate,
                    locations.clone(),
                    values,
                    derivatives.clone(),
                )?)
            }
        }
    }

    /// Evaluates the spline, sampling coordinates through `sample`.
    pub fn apply<E, S>(&self, sample: &mut S) -> Result<f32, E>
    where
        S: FnMut(&F) -> Result<f32, E>,
    {
        match self {
            CubicSpline::Constant(v) => Ok(*v),
            CubicSpline::MultiPoint {
                coordinate,
                locations,
                values,
                derivatives,
                ..
            } => {
                let point = sample(coordinate)?;
                let i = find_interval_start(locations, point);
                let n = locations.len() as isize - 1;
                if i < 0 {
                    Ok(linear_extend(
                        point,
                        locations,
                        values[0].apply(sample)?,
                        derivatives,
                        0,
                    ))
                } else if i >= n {
                    let n = n as usize;
                    Ok(linear_extend(
                        point,
                        locations,
                        values[n].apply(sample)?,
                        derivatives,
                        n,
                    ))
                } else {
                    let i = i as usize;
                    let loc0 = locations[i];
                    let loc1 = locations[i + 1];
                    let der0 = derivatives[i];
                    let der1 = derivatives[i + 1];
                    let f = (point - loc0) / (loc1 - loc0);

                    let value0 = values[i].apply(sample)?;
                    let value1 = values[i + 1].apply(sample)?;

                    let f8 = der0 * (loc1 - loc0) - (value1 - value0);
                    let f9 = -der1 * (loc1 - loc0) + (value1 - value0);

                    Ok(value0.lerp(value1, f) + f * (1.0 - f) * f8.lerp(f9, f))
                }
            }
        }
    }

    pub fn map_all<G, V>(&self, visitor: &mut V) -> Result<CubicSpline<G>, BuildError>
    where
        G: RangeFunction,
        V: FnMut(&F) -> G,
    {
        self.try_map_all(&mut |c| Ok::<G, BuildError>(visitor(c)))
    }

    pub fn coordinates(&self) -> Vec<&F> {
        let mut out = Vec::new();
        self.collect_coordinates(&mut out);
        out
    }

    fn collect_coordinates<'a>(&'a self, out: &mut Vec<&'a F>) {
        if let CubicSpline::MultiPoint {
            coordinate, values, ..
        } = self
        {
            out.push(coordinate);
            for value in values {
                value.collect_coordinates(out);
            }
        }
    }
}

impl<F> CubicSpline<F> {
    pub fn min_value(&self) -> f32 {
        match self {
            CubicSpline::Constant(v) => *v,
            CubicSpline::MultiPoint { min_value, .. } => *min_value,
        }
    }

    pub fn max_value(&self) -> f32 {
        match self {
            CubicSpline::Constant(v) => *v,
            CubicSpline::MultiPoint { max_value, .. } => *max_value,
        }
    }
}

impl<F: RangeFunction> CubicSpline<F> {
    /// Infallible evaluation for coordinates that cannot fail to sample.
    pub fn apply_with<S>(&self, sample: &mut S) -> f32
    where
        S: FnMut(&F) -> f32,
    {
        match self.apply(&mut |c| Ok::<f32, Infallible>(sample(c))) {
            Ok(v) => v,
            Err(never) => match never {},
        }
    }
}

impl<F> From<f32> for CubicSpline<F> {
    #[inline]
    fn from(value: f32) -> Self {
        CubicSpline::Constant(value)
    }
}

pub struct Builder<F> {
    coordinate: F,
    locations: Vec<f32>,
    values: Vec<CubicSpline<F>>,
    derivatives: Vec<f32>,
}

impl<F: RangeFunction> Builder<F> {
    pub fn new(coordinate: F) -> Self {
        Self {
            coordinate,
            locations: Vec::new(),
            values: Vec::new(),
            derivatives: Vec::new(),
        }
    }

    pub fn add_point<V: Into<SplineValue<F>>>(
        mut self,
        location: f32,
        value: V,
        derivative: f32,
    ) -> Self {
        self.locations.push(location);
        self.values.push(value.into().0);
        self.derivatives.push(derivative);
        self
    }

    pub fn build(self) -> Result<CubicSpline<F>, BuildError> {
        CubicSpline::multipoint(
            self.coordinate,
            self.locations,
            self.values,
            self.derivatives,
        )
    }
}

/// Anything usable as a point value while building: a constant, a spline, or a nested builder.
pub struct SplineValue<F>(CubicSpline<F>);

impl<F> From<f32> for SplineValue<F> {
    fn from(value: f32) -> Self {
        SplineValue(CubicSpline::Constant(value))
    }
}

impl<F> From<f64> for SplineValue<F> {
    fn from(value: f64) -> Self {
        SplineValue(CubicSpline::Constant(value as f32))
    }
}

impl<F> From<CubicSpline<F>> for SplineValue<F> {
    fn from(value: CubicSpline<F>) -> Self {
        SplineValue(value)
    }
}

impl<F: RangeFunction> From<Builder<F>> for SplineValue<F> {
    // An empty nested builder degrades to a zero constant.
    fn from(value: Builder<F>) -> Self {
        SplineValue(value.build().unwrap_or(CubicSpline::Constant(0.0)))
    }
}

#[inline]
fn find_interval_start(locations: &[f32], point: f32) -> isize {
    binary_search(0, locations.len(), |i| point < locations[i]) as isize - 1
}

fn linear_extend(point: f32, locations: &[f32], value: f32, derivatives: &[f32], i: usize) -> f32 {
    let f = derivatives[i];
    if f == 0.0 {
        value
    } else {
        value + f * (point - locations[i])
    }
}

fn binary_search<F>(min: usize, max: usize, predicate: F) -> usize
where
    F: Fn(usize) -> bool,
{
    let mut min = min;
    let mut max = max;
    while min < max {
        let mid = min + (max - min) / 2;
        if predicate(mid) {
            max = mid;
        } else {
            min = mid + 1;
        }
    }
    min
}

#[cfg(test)]
mod test {
    use crate::error::BuildError;
    use crate::spline::{Builder, CubicSpline, RangeFunction};

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Coordinate {
        Identity,
        Square,
    }

    impl RangeFunction for Coordinate {
        fn min_value(&self) -> f32 {
            f32::NEG_INFINITY
        }

        fn max_value(&self) -> f32 {
            f32::INFINITY
        }
    }

    struct Bounded(f32, f32);

    impl RangeFunction for Bounded {
        fn min_value(&self) -> f32 {
            self.0
        }

        fn max_value(&self) -> f32 {
            self.1
        }
    }

    fn eval(spline: &CubicSpline<Coordinate>, x: f32) -> f32 {
        spline.apply_with(&mut |c| match c {
            Coordinate::Identity => x,
            Coordinate::Square => x * x,
        })
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn simple() {
        let spline = Builder::new(Coordinate::Identity)
            .add_point(-1.1, 0.044, 0.0)
            .add_point(-1.02, -0.2222, 0.0)
            .add_point(-0.51, -0.2222, 0.0)
            .add_point(-0.44, -0.12, 0.0)
            .add_point(-0.18, -0.12, 0.0)
            .build()
            .unwrap();
        assert_eq!(eval(&spline, -1.6), 0.044);
        assert_eq!(eval(&spline, -0.7), -0.2222);
        assert_eq!(eval(&spline, -0.2), -0.12);
        assert!(close(eval(&spline, -0.5), -0.21653879));
    }

    #[test]
    fn derivatives() {
        let spline = Builder::new(Coordinate::Identity)
            .add_point(0.0, 0.0178, 0.2)
            .add_point(0.3, 0.23, 0.7)
            .add_point(0.46, 0.89, -0.03)
            .add_point(0.6, 0.4, 0.0)
            .build()
            .unwrap();
        assert_eq!(eval(&spline, 0.0), 0.0178);
        assert!(close(eval(&spline, -0.1), -0.0022000019));
        assert!(close(eval(&spline, 0.31), 0.24358201));
        assert!(close(eval(&spline, 0.4), 0.69171876));
    }

    #[test]
    fn nested() {
        let spline = Builder::new(Coordinate::Identity)
            .add_point(0.0, 0.23, 0.0)
            .add_point(
                0.2,
                Builder::new(Coordinate::Square)
                    .add_point(-0.1, 0.0, 0.0)
                    .add_point(1.2, 0.4, 0.0),
                0.0,
            )
            .add_point(0.7, 0.7, 0.0)
            .build()
            .unwrap();
        assert!(close(eval(&spline, 0.3), 0.09352946));
        assert_eq!(spline.coordinates().len(), 2);
    }

    #[test]
    fn empty_is_rejected() {
        assert_eq!(
            Builder::new(Coordinate::Identity).build(),
            Err(BuildError::EmptySpline)
        );
    }

    #[test]
    fn bounds_contain_samples() {
        let spline = Builder::new(Bounded(-1.0, 1.0))
            .add_point(-0.5, -0.3, 0.4)
            .add_point(0.0, 0.6, -0.2)
            .add_point(0.5, 0.1, 0.8)
            .build()
            .unwrap();
        for i in -100..=100 {
            let x = i as f32 / 100.0;
            let v = spline.apply_with(&mut |_| x);
            assert!(v >= spline.min_value() - 1e-6 && v <= spline.max_value() + 1e-6);
        }
    }

    #[test]
    fn map_all_rebinds_coordinates() {
        let spline = Builder::new(Coordinate::Identity)
            .add_point(0.0, 0.0, 1.0)
            .add_point(1.0, 1.0, 1.0)
            .build()
            .unwrap();
        let mapped = spline.map_all(&mut |_| Bounded(0.0, 0.5)).unwrap();
        assert_eq!(mapped.apply_with(&mut |_| 0.25), 0.25);
    }
}
