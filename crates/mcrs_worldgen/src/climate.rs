use crate::proto::Interval;
use serde::{Deserialize, Serialize};
use std::array;

/// Number of climate dimensions, including the offset.
const DIMENSIONS: usize = 7;

#[derive(Clone, Debug, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Interval<QuantizedCoord>")]
#[serde(into = "Interval<QuantizedCoord>")]
pub struct Param {
    pub min: QuantizedCoord,
    pub max: QuantizedCoord,
}

impl<I: Into<QuantizedCoord>> From<I> for Param {
    fn from(value: I) -> Self {
        let value = value.into();
        Param {
            min: value,
            max: value,
        }
    }
}

impl Param {
    pub fn span(min: f64, max: f64) -> Self {
        Param {
            min: min.into(),
            max: max.into(),
        }
    }

    fn distance(&self, value: i64) -> i64 {
        let above = value - self.max.0;
        if above > 0 {
            above
        } else {
            (self.min.0 - value).max(0)
        }
    }

    fn center(&self, absolute: bool) -> i64 {
        let center = (self.min.0 + self.max.0) / 2;
        if absolute { center.abs() } else { center }
    }
}

#[derive(Clone, Debug, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamPoint {
    pub temperature: Param,
    pub humidity: Param,
    pub continentalness: Param,
    pub erosion: Param,
    pub depth: Param,
    pub weirdness: Param,
    pub offset: QuantizedCoord,
}

impl ParamPoint {
    #[inline]
    pub fn new<P, Q>(
        temperature: P,
        humidity: P,
        continentalness: P,
        erosion: P,
        depth: P,
        weirdness: P,
        offset: Q,
    ) -> ParamPoint
    where
        P: Into<Param>,
        Q: Into<QuantizedCoord>,
    {
        ParamPoint {
            temperature: temperature.into(),
            humidity: humidity.into(),
            continentalness: continentalness.into(),
            erosion: erosion.into(),
            depth: depth.into(),
            weirdness: weirdness.into(),
            offset: offset.into(),
        }
    }
}

impl From<ParamPoint> for [Param; DIMENSIONS] {
    #[inline]
    fn from(value: ParamPoint) -> Self {
        [
            value.temperature,
            value.humidity,
            value.continentalness,
            value.erosion,
            value.depth,
            value.weirdness,
            Param {
                min: value.offset,
                max: value.offset,
            },
        ]
    }
}

/// Climate sampled at one position.
#[derive(Clone, Debug, Copy, PartialEq)]
pub struct TargetPoint {
    pub temperature: QuantizedCoord,
    pub humidity: QuantizedCoord,
    pub continentalness: QuantizedCoord,
    pub erosion: QuantizedCoord,
    pub depth: QuantizedCoord,
    pub weirdness: QuantizedCoord,
}

impl TargetPoint {
    #[inline]
    pub fn new<Q>(
        temperature: Q,
        humidity: Q,
        continentalness: Q,
        erosion: Q,
        depth: Q,
        weirdness: Q,
    ) -> TargetPoint
    where
        Q: Into<QuantizedCoord>,
    {
        TargetPoint {
            temperature: temperature.into(),
            humidity: humidity.into(),
            continentalness: continentalness.into(),
            erosion: erosion.into(),
            depth: depth.into(),
            weirdness: weirdness.into(),
        }
    }
}

impl From<TargetPoint> for [i64; DIMENSIONS] {
    #[inline]
    fn from(value: TargetPoint) -> Self {
        [
            value.temperature.0,
            value.humidity.0,
            value.continentalness.0,
            value.erosion.0,
            value.depth.0,
            value.weirdness.0,
            0,
        ]
    }
}

#[derive(Clone, Debug, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "f64")]
#[serde(into = "f64")]
pub struct QuantizedCoord(pub i64);

impl From<f64> for QuantizedCoord {
    #[inline]
    fn from(value: f64) -> Self {
        QuantizedCoord(QuantizedCoord::quantize_coord(value))
    }
}

impl From<QuantizedCoord> for f64 {
    #[inline]
    fn from(value: QuantizedCoord) -> Self {
        QuantizedCoord::unquantize_coord(value.0)
    }
}

impl From<i64> for QuantizedCoord {
    #[inline]
    fn from(value: i64) -> Self {
        QuantizedCoord(value)
    }
}

impl QuantizedCoord {
    /// Climate values are single precision before quantization.
    #[inline]
    fn quantize_coord(coord: f64) -> i64 {
        (coord as f32 * 10000.0) as i64
    }

    #[inline]
    fn unquantize_coord(coord: i64) -> f64 {
        coord as f64 / 10000.0
    }
}

impl From<Interval<QuantizedCoord>> for Param {
    #[inline]
    fn from(value: Interval<QuantizedCoord>) -> Self {
        Param {
            min: value.min,
            max: value.max,
        }
    }
}

impl From<Param> for Interval<QuantizedCoord> {
    #[inline]
    fn from(value: Param) -> Self {
        Interval {
            min: value.min,
            max: value.max,
        }
    }
}

/// Nearest-neighbour index over climate parameter boxes.
#[derive(Clone, Debug)]
pub struct RTree<T> {
    root: RNode<T>,
}

impl<T: Clone> RTree<T> {
    /// `None` when there are no points.
    pub fn new<I: IntoIterator<Item = (ParamPoint, T)>>(points: I) -> Option<RTree<T>> {
        let leaves: Vec<RNode<T>> = points
            .into_iter()
            .map(|(point, value)| RNode::new_leaf(point, value))
            .collect();
        if leaves.is_empty() {
            return None;
        }
        Some(RTree {
            root: Self::build(leaves),
        })
    }

    /// Value of the point closest to `target`. Ties go to the point found first.
    pub fn search(&self, target: TargetPoint) -> &T {
        let values: [i64; DIMENSIONS] = target.into();
        match self.root.search(&values, None) {
            Some(RNode::Leaf { value, .. }) => value,
            _ => self.root.first_value(),
        }
    }

    fn build(mut nodes: Vec<RNode<T>>) -> RNode<T> {
        if nodes.len() == 1 {
            if let Some(node) = nodes.pop() {
                return node;
            }
        }
        if nodes.len() <= 6 {
            nodes.sort_by_key(|node| {
                node.parameter_space()
                    .iter()
                    .map(|param| param.center(true))
                    .sum::<i64>()
            });
            return RNode::new_subtree(nodes);
        }
        let mut best_cost = i64::MAX;
        let mut best_dimension = 0;
        let mut best = Vec::new();
        for dimension in 0..DIMENSIONS {
            nodes.sort_by_key(|node| sort_key(node.parameter_space(), dimension, false));
            let buckets = Self::bucketize(&nodes);
            let cost = buckets
                .iter()
                .map(|bucket| {
                    bucket
                        .parameters
                        .iter()
                        .map(|param| (param.max.0 - param.min.0).abs())
                        .sum::<i64>()
                })
                .sum();
            if best_cost > cost {
                best_cost = cost;
                best_dimension = dimension;
                best = buckets;
            }
        }
        best.sort_by_key(|bucket| sort_key(&bucket.parameters, best_dimension, true));
        RNode::new_subtree(
            best.into_iter()
                .map(|bucket| Self::build(bucket.children))
                .collect(),
        )
    }

    fn bucketize(nodes: &[RNode<T>]) -> Vec<RSubTree<T>> {
        let bucket_size = 6f64
            .powf(((nodes.len() as f64 - 0.01).ln() / 6f64.ln()).floor())
            as usize;
        nodes
            .chunks(bucket_size.max(1))
            .map(|chunk| RSubTree::new(chunk.to_vec()))
            .collect()
    }
}

/// Centres of every dimension, starting at `dimension` and wrapping around.
fn sort_key(space: &[Param; DIMENSIONS], dimension: usize, absolute: bool) -> [i64; DIMENSIONS] {
    array::from_fn(|i| space[(dimension + i) % DIMENSIONS].center(absolute))
}

#[derive(Clone, Debug)]
enum RNode<T> {
    Leaf {
        value: T,
        parameters: [Param; DIMENSIONS],
    },
    SubTree(RSubTree<T>),
}

#[derive(Clone, Debug)]
struct RSubTree<T> {
    children: Vec<RNode<T>>,
    parameters: [Param; DIMENSIONS],
}

impl<T> RSubTree<T> {
    fn new(children: Vec<RNode<T>>) -> Self {
        let mut parameters = *children[0].parameter_space();
        for node in &children[1..] {
            for (bounds, param) in parameters.iter_mut().zip(node.parameter_space()) {
                bounds.min = bounds.min.min(param.min);
                bounds.max = bounds.max.max(param.max);
            }
        }
        RSubTree {
            children,
            parameters,
        }
    }
}

impl<T> RNode<T> {
    fn new_leaf(parameter_point: ParamPoint, value: T) -> Self {
        RNode::Leaf {
            value,
            parameters: parameter_point.into(),
        }
    }

    fn new_subtree(children: Vec<RNode<T>>) -> Self {
        RNode::SubTree(RSubTree::new(children))
    }

    fn parameter_space(&self) -> &[Param; DIMENSIONS] {
        match self {
            RNode::Leaf { parameters, .. } => parameters,
            RNode::SubTree(subtree) => &subtree.parameters,
        }
    }

    fn first_value(&self) -> &T {
        match self {
            RNode::Leaf { value, .. } => value,
            RNode::SubTree(subtree) => subtree.children[0].first_value(),
        }
    }

    /// Squared distance from `values` to this node's parameter box.
    fn distance(&self, values: &[i64; DIMENSIONS]) -> i64 {
        values
            .iter()
            .zip(self.parameter_space())
            .map(|(value, param)| {
                let distance = param.distance(*value);
                distance * distance
            })
            .sum()
    }

    fn search<'a>(&'a self, values: &[i64; DIMENSIONS], leaf: Option<&'a RNode<T>>) -> Option<&'a RNode<T>> {
        let RNode::SubTree(subtree) = self else {
            return Some(self);
        };
        let mut best_distance = leaf.map_or(i64::MAX, |leaf| leaf.distance(values));
        let mut best = leaf;
        for child in &subtree.children {
            let child_distance = child.distance(values);
            if best_distance <= child_distance {
                continue;
            }
            if let Some(found) = child.search(values, best) {
                let found_distance = if std::ptr::eq(child, found) {
                    child_distance
                } else {
                    found.distance(values)
                };
                if best_distance > found_distance {
                    best_distance = found_distance;
                    best = Some(found);
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod test {
    use crate::climate::{Param, ParamPoint, QuantizedCoord, RTree, TargetPoint};

    #[test]
    fn search_test() {
        let tree = RTree::new([
            (ParamPoint::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0), "red".to_owned()),
            (ParamPoint::new(1.0, 0.0, 0.0, 0.8, 0.0, 0.0, 0), "green".to_owned()),
            (ParamPoint::new(1.0, 0.0, 0.6, -0.8, -0.1, 0.0, 0), "blue".to_owned()),
        ])
        .unwrap();
        assert_eq!(tree.search(TargetPoint::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0)), "red");
        assert_eq!(tree.search(TargetPoint::new(1.0, 0.0, 0.0, 0.8, 0.0, 0.0)), "green");
        assert_eq!(tree.search(TargetPoint::new(1.0, 0.0, 0.6, -0.8, -0.1, 0.0)), "blue");
    }

    #[test]
    fn complex_test_search() {
        let tree = RTree::new([
            (ParamPoint::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0), "red".to_owned()),
            (ParamPoint::new(1.0, 0.0, 0.0, 0.8, 0.0, 0.0, 0), "green".to_owned()),
            (ParamPoint::new(1.0, 0.0, 0.6, -0.8, -0.1, 0.0, 0), "blue".to_owned()),
            (ParamPoint::new(0.0, 0.2, 0.0, 0.0, 0.0, 0.0, 0), "yellow".to_owned()),
            (ParamPoint::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.5, 0), "orange".to_owned()),
            (ParamPoint::new(0.0, 0.2, 0.0, 0.0, 0.0, 0.9, 0), "purple".to_owned()),
            (ParamPoint::new(0.0, -0.3, 0.0, 0.0, 0.0, 0.0, 0), "cyan".to_owned()),
            (ParamPoint::new(0.0, -0.9, 0.0, 0.0, 0.0, 0.5, 0), "brown".to_owned()),
            (ParamPoint::new(0.0, -0.1, 0.5, 0.0, 0.0, 0.0, 0), "black".to_owned()),
            (ParamPoint::new(0.0, 0.7, 0.0, 0.0, 0.0, 0.0, 0), "pink".to_owned()),
        ])
        .unwrap();

        assert_eq!(tree.search(TargetPoint::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0)), "red");
        assert_eq!(tree.search(TargetPoint::new(0.4, 0.0, 0.0, 0.0, 0.7, 0.0)), "red");
        assert_eq!(tree.search(TargetPoint::new(0.0, 0.3, 0.0, -0.2, 0.0, 1.0)), "purple");
        assert_eq!(tree.search(TargetPoint::new(0.0, 0.0, 0.7, -0.2, 0.0, 0.1)), "black");
        assert_eq!(tree.search(TargetPoint::new(0.0, 0.6, 0.0, 0.0, 0.0, 0.0)), "pink");
    }

    #[test]
    fn distance_is_squared() {
        // one far dimension outweighs two near ones
        let tree = RTree::new([
            (ParamPoint::new(0.3, 0.3, 0.0, 0.0, 0.0, 0.0, 0), "spread"),
            (ParamPoint::new(0.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0), "single"),
        ])
        .unwrap();
        assert_eq!(*tree.search(TargetPoint::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0)), "spread");
    }

    #[test]
    fn ranges_contain_their_points() {
        let tree = RTree::new([
            (
                ParamPoint::new(Param::span(-1.0, -0.45), Param::span(-1.0, 1.0), Param::span(-1.0, 1.0), Param::span(-1.0, 1.0), Param::span(-1.0, 1.0), Param::span(-1.0, 1.0), 0),
                "cold",
            ),
            (
                ParamPoint::new(Param::span(-0.45, 1.0), Param::span(-1.0, 1.0), Param::span(-1.0, 1.0), Param::span(-1.0, 1.0), Param::span(-1.0, 1.0), Param::span(-1.0, 1.0), 0),
                "warm",
            ),
        ])
        .unwrap();
        assert_eq!(*tree.search(TargetPoint::new(-0.8, 0.1, 0.2, 0.0, 0.0, 0.0)), "cold");
        assert_eq!(*tree.search(TargetPoint::new(0.3, 0.1, 0.2, 0.0, 0.0, 0.0)), "warm");
        assert!(RTree::<u8>::new([]).is_none());
    }

    #[test]
    fn quantized_through_single_precision() {
        assert_eq!(QuantizedCoord::from(0.1), QuantizedCoord((0.1f32 * 10000.0) as i64));
        assert_eq!(f64::from(QuantizedCoord(2500)), 0.25);
    }
}
