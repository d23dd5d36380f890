use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OccupancyError {
    #[error("cell count mismatch: expected {expected}, got {actual}")]
    CellCountMismatch { expected: usize, actual: usize },
    #[error("coordinates {coordinates:?} are outside dimensions {dims:?}")]
    OutOfRange { coordinates: Vec<u32>, dims: Vec<u32> },
}

/// Linear storage index of `coordinates` inside a grid of extent `dims`.
///
/// The first dimension varies fastest, so a 2D index is `x + y * width`.
/// Returns `None` when any coordinate is out of range.
pub fn compute_index<const D: usize>(coordinates: [u32; D], dims: [u32; D]) -> Option<usize> {
    let mut stride = 1usize;
    let mut result = 0usize;
    for (coordinate, dim) in coordinates.iter().zip(dims.iter()) {
        if coordinate >= dim {
            return None;
        }
        result += *coordinate as usize * stride;
        stride *= *dim as usize;
    }
    Some(result)
}

/// Inverse of [`compute_index`].
pub fn compute_coordinates<const D: usize>(index: usize, dims: [u32; D]) -> Option<[u32; D]> {
    if index >= storage_size(dims) {
        return None;
    }
    let mut remainder = index;
    let mut coordinates = [0u32; D];
    for (coordinate, dim) in coordinates.iter_mut().zip(dims.iter()) {
        let dim = *dim as usize;
        *coordinate = (remainder % dim) as u32;
        remainder /= dim;
    }
    Some(coordinates)
}

fn storage_size<const D: usize>(dims: [u32; D]) -> usize {
    dims.iter().map(|dim| *dim as usize).product()
}

#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyMap<T, const D: usize> {
    dims: [u32; D],
    cells: Vec<T>,
}

pub type OccupancyMap2D<T = bool> = OccupancyMap<T, 2>;

impl<T, const D: usize> Default for OccupancyMap<T, D> {
    fn default() -> Self {
        Self {
            dims: [0; D],
            cells: Vec::new(),
        }
    }
}

impl<T: Clone, const D: usize> OccupancyMap<T, D> {
    pub fn new(dims: [u32; D], initial_state: T) -> Self {
        Self {
            dims,
            cells: vec![initial_state; storage_size(dims)],
        }
    }

    pub fn fill(&mut self, value: T) {
        for cell in &mut self.cells {
            *cell = value.clone();
        }
    }
}

impl<T, const D: usize> OccupancyMap<T, D> {
    pub fn from_cells(dims: [u32; D], cells: Vec<T>) -> Result<Self, OccupancyError> {
        let expected = storage_size(dims);
        if cells.len() != expected {
            return Err(OccupancyError::CellCountMismatch {
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self { dims, cells })
    }

    pub fn dims(&self) -> [u32; D] {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn index_of(&self, coordinates: [u32; D]) -> Option<usize> {
        compute_index(coordinates, self.dims)
    }

    pub fn coordinates_of(&self, index: usize) -> Option<[u32; D]> {
        compute_coordinates(index, self.dims)
    }

    pub fn get(&self, coordinates: [u32; D]) -> Option<&T> {
        self.index_of(coordinates)
            .and_then(|index| self.cells.get(index))
    }

    pub fn get_mut(&mut self, coordinates: [u32; D]) -> Option<&mut T> {
        let index = self.index_of(coordinates)?;
        self.cells.get_mut(index)
    }

    pub fn set(&mut self, coordinates: [u32; D], value: T) -> Result<(), OccupancyError> {
        let dims = self.dims;
        let cell = self
            .get_mut(coordinates)
            .ok_or_else(|| OccupancyError::OutOfRange {
                coordinates: coordinates.to_vec(),
                dims: dims.to_vec(),
            })?;
        *cell = value;
        Ok(())
    }

    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    pub fn iter(&self) -> impl Iterator<Item = ([u32; D], &T)> + '_ {
        let dims = self.dims;
        self.cells.iter().enumerate().filter_map(move |(index, cell)| {
            compute_coordinates(index, dims).map(|coordinates| (coordinates, cell))
        })
    }
}
