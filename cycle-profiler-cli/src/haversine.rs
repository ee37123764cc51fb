use profiler::Session;
use profiler::timer::TickSource;
use profiler::timer::WallClock;
use rand::Rng;

/// The earth's radius in kilometers, as commonly used in haversine reference
/// implementations.
pub(crate) const EARTH_RADIUS: f64 = 6372.8;

/// Two points on a sphere, as longitude `x` and latitude `y` in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct CoordinatePair {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl CoordinatePair {
    pub fn random(rng: &mut impl Rng) -> Self {
        Self {
            x0: rng.random_range(-180.0..180.0),
            y0: rng.random_range(-90.0..90.0),
            x1: rng.random_range(-180.0..180.0),
            y1: rng.random_range(-90.0..90.0),
        }
    }

    /// The great-circle distance between the two points on a sphere with the
    /// given radius.
    pub fn haversine_distance(&self, radius: f64) -> f64 {
        let lat_0 = self.y0.to_radians();
        let lat_1 = self.y1.to_radians();
        let delta_lat = (self.y1 - self.y0).to_radians();
        let delta_lon = (self.x1 - self.x0).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat_0.cos() * lat_1.cos() * (delta_lon / 2.0).sin().powi(2);
        let central_angle = 2.0 * a.sqrt().asin();

        radius * central_angle
    }
}

pub(crate) fn generate_pairs<C, W>(
    session: &mut Session<C, W>,
    rng: &mut impl Rng,
    num_pairs: usize,
) -> Vec<CoordinatePair>
where
    C: TickSource,
    W: WallClock,
{
    let _scope = session.scope("generate");
    (0..num_pairs).map(|_| CoordinatePair::random(rng)).collect()
}

pub(crate) fn sum_of_distances<C, W>(session: &mut Session<C, W>, pairs: &[CoordinatePair]) -> f64
where
    C: TickSource,
    W: WallClock,
{
    let mut scope = session.scope("sum");
    let mut sum = 0.0;
    for pair in pairs {
        let _scope = scope.scope("haversine");
        sum += pair.haversine_distance(EARTH_RADIUS);
    }
    sum
}

/// The mean haversine distance of all pairs, or 0 if there are none.
pub(crate) fn average_distance<C, W>(session: &mut Session<C, W>, pairs: &[CoordinatePair]) -> f64
where
    C: TickSource,
    W: WallClock,
{
    let mut scope = session.scope("average");
    if pairs.is_empty() {
        return 0.0;
    }
    sum_of_distances(&mut scope, pairs) / pairs.len() as f64
}
