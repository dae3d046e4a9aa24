use std::path::Path;

use kdtree::distance::squared_euclidean;
use kdtree::KdTree;

use super::error::PrepError;
use super::geometry::Point2d;
use super::output_utils;


/// Stations are identified by their position in the node file.
pub type StationId = usize;

#[derive(PartialEq, Debug, Clone)]
pub struct Station {
    pub id: StationId,
    pub pos: Point2d,
}

/// The ordered set of all stations.  Ids are assigned once, here, and never change.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct StationSet {
    stations: Vec<Station>,
}

impl StationSet {
    pub fn from_positions(positions: Vec<Point2d>) -> StationSet {
        let stations = positions.into_iter().enumerate()
                                .map(|(id, pos)| Station {id, pos})
                                .collect();
        StationSet {stations}
    }

    /// Reads a headerless node file of `id,lon,lat` rows.  The id column is ignored; the row
    /// order decides station ids.
    pub fn from_nodes_csv(path: &Path) -> Result<StationSet, PrepError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;
        let mut positions = vec![];
        for result in reader.records() {
            let record = result?;
            let line = record.position().map(|pos| pos.line()).unwrap_or(0);
            let coord = |idx: usize| -> Result<f64, PrepError> {
                record.get(idx)
                      .and_then(|ss| ss.trim().parse().ok())
                      .ok_or_else(|| PrepError::MalformedRow {
                          line,
                          reason: format!("bad station coordinate in {:?}", path),
                      })
            };
            positions.push(Point2d::new(coord(1)?, coord(2)?));
        }

        log::info!("Loaded {} stations from {:?}", positions.len(), path);
        Ok(StationSet::from_positions(positions))
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn get(&self, id: StationId) -> Option<&Station> {
        self.stations.get(id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Station> {
        self.stations.iter()
    }

    /// Writes the station catalog: the station count, then `lon lat id` for each station.
    pub fn write_catalog(&self, path: &Path) -> Result<(), PrepError> {
        let mut writer = output_utils::create_writer(path, b' ')?;
        writer.write_record(&[self.len().to_string()])?;
        for station in self.iter() {
            writer.write_record(&[
                output_utils::fmt_float(station.pos.x_coord),
                output_utils::fmt_float(station.pos.y_coord),
                station.id.to_string(),
            ])?;
        }
        writer.flush().map_err(|err| PrepError::io(path, err))?;
        Ok(())
    }
}


/// Answers nearest-station queries by planar distance on raw coordinates.
pub struct StationIndex {
    tree: KdTree<f64, StationId, [f64; 2]>,
}

impl StationIndex {
    pub fn new(stations: &StationSet) -> Result<StationIndex, PrepError> {
        if stations.is_empty() {
            return Err(PrepError::EmptyIndex);
        }

        let mut tree = KdTree::new(2);
        for station in stations.iter() {
            tree.add(station.pos.as_array(), station.id)
                .map_err(|err| PrepError::SpatialIndex(
                    format!("station {}: {:?}", station.id, err)))?;
        }
        log::debug!("Built station index over {} stations", stations.len());
        Ok(StationIndex {tree})
    }

    /// Ties between equally distant stations go to the lowest id.
    pub fn nearest(&self, point: &Point2d) -> Result<StationId, PrepError> {
        if !point.is_finite() {
            return Err(PrepError::SpatialIndex(
                format!("cannot look up non-finite point {:?}", point)));
        }
        let query = point.as_array();
        let mut neighbours = self.tree.iter_nearest(&query, &squared_euclidean)
            .map_err(|err| PrepError::SpatialIndex(format!("{:?}", err)))?;
        let (best_dist, best_id) = match neighbours.next() {
            Some((dist, id)) => (dist, *id),
            None => return Err(PrepError::EmptyIndex),
        };
        let nearest_id = neighbours.take_while(|(dist, _)| *dist <= best_dist)
                                   .fold(best_id, |acc, (_, id)| acc.min(*id));
        Ok(nearest_id)
    }

    /// Resolves each point independently, keeping the order of the queries.
    pub fn nearest_batch(&self, points: &[Point2d]) -> Result<Vec<StationId>, PrepError> {
        points.iter().map(|pp| self.nearest(pp)).collect()
    }
}
