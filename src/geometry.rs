use geo::{Contains, LineString, Point, Polygon};

use super::error::PrepError;


/// A planar point.  For trip and station data, x is longitude and y is latitude.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Point2d {
    pub x_coord: f64,
    pub y_coord: f64,
}

impl Point2d {
    pub fn new(x_coord: f64, y_coord: f64) -> Point2d {
        Point2d{x_coord, y_coord}
    }

    pub fn as_array(&self) -> [f64; 2] {
        [self.x_coord, self.y_coord]
    }

    pub fn is_finite(&self) -> bool {
        self.x_coord.is_finite() && self.y_coord.is_finite()
    }

    pub fn minus(&self, other: &Point2d) -> Point2d {
        Point2d::new(self.x_coord - other.x_coord, self.y_coord - other.y_coord)
    }

    pub fn euclidean_distance(&self, other: &Point2d) -> f64 {
        let diff = self.minus(other);
        (diff.x_coord.powi(2) + diff.y_coord.powi(2)).sqrt()
    }
}

impl From<&Point2d> for Point<f64> {
    fn from(point: &Point2d) -> Point<f64> {
        Point::new(point.x_coord, point.y_coord)
    }
}


/// The polygon trips must start and end inside of to be admitted.
#[derive(Debug, Clone)]
pub struct ServiceArea {
    polygon: Polygon<f64>,
}

impl ServiceArea {
    pub fn new(vertices: &[Point2d]) -> Result<ServiceArea, PrepError> {
        if vertices.len() < 3 {
            return Err(PrepError::Config(format!(
                "service area needs at least 3 vertices, got {}", vertices.len())));
        }
        if let Some(bad) = vertices.iter().find(|vv| !vv.is_finite()) {
            return Err(PrepError::Config(format!("service area vertex {:?} is not finite", bad)));
        }

        // the exterior ring is closed automatically
        let ring: Vec<(f64, f64)> = vertices.iter().map(|vv| (vv.x_coord, vv.y_coord)).collect();
        Ok(ServiceArea {
            polygon: Polygon::new(LineString::from(ring), vec![]),
        })
    }

    /// Points on the boundary are not contained.
    pub fn contains(&self, point: &Point2d) -> bool {
        self.polygon.contains(&Point::from(point))
    }

    pub fn admits(&self, pickup: &Point2d, dropoff: &Point2d) -> bool {
        self.contains(pickup) && self.contains(dropoff)
    }
}
