//! The two traffic axes and the four approaches that feed them.

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// One of the two orthogonal traffic axes. The signal gives green to
/// exactly one axis at a time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Encode, Decode,
)]
pub enum Axis {
    EastWest,
    NorthSouth,
}

impl Axis {
    pub const ALL: [Axis; 2] = [Axis::EastWest, Axis::NorthSouth];

    pub fn other(self) -> Axis {
        match self {
            Axis::EastWest => Axis::NorthSouth,
            Axis::NorthSouth => Axis::EastWest,
        }
    }

    /// Approaches served when this axis is green, in draw order.
    pub fn approaches(self) -> [Approach; 2] {
        match self {
            Axis::EastWest => [Approach::East, Approach::West],
            Axis::NorthSouth => [Approach::North, Approach::South],
        }
    }

    /// Discrete action encoding used by decision ports: 0 = EW, 1 = NS.
    pub fn action(self) -> u8 {
        match self {
            Axis::EastWest => 0,
            Axis::NorthSouth => 1,
        }
    }

    pub fn from_action(action: i64) -> Option<Axis> {
        match action {
            0 => Some(Axis::EastWest),
            1 => Some(Axis::NorthSouth),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Axis::EastWest => "EW",
            Axis::NorthSouth => "NS",
        }
    }
}

/// A single incoming approach. Each axis owns two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Approach {
    North,
    South,
    East,
    West,
}

impl Approach {
    pub const ALL: [Approach; 4] = [
        Approach::North,
        Approach::South,
        Approach::East,
        Approach::West,
    ];

    pub fn axis(self) -> Axis {
        match self {
            Approach::North | Approach::South => Axis::NorthSouth,
            Approach::East | Approach::West => Axis::EastWest,
        }
    }

    /// Stable storage index (N, S, E, W).
    pub fn index(self) -> usize {
        match self {
            Approach::North => 0,
            Approach::South => 1,
            Approach::East => 2,
            Approach::West => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_is_involution() {
        for axis in Axis::ALL {
            assert_ne!(axis, axis.other());
            assert_eq!(axis, axis.other().other());
        }
    }

    #[test]
    fn test_approaches_belong_to_axis() {
        for axis in Axis::ALL {
            for approach in axis.approaches() {
                assert_eq!(approach.axis(), axis);
            }
        }
    }

    #[test]
    fn test_action_encoding() {
        assert_eq!(Axis::from_action(0), Some(Axis::EastWest));
        assert_eq!(Axis::from_action(1), Some(Axis::NorthSouth));
        assert_eq!(Axis::from_action(2), None);
        assert_eq!(Axis::from_action(-1), None);
        for axis in Axis::ALL {
            assert_eq!(Axis::from_action(axis.action() as i64), Some(axis));
        }
    }

    #[test]
    fn test_approach_indices_unique() {
        let mut seen = [false; 4];
        for approach in Approach::ALL {
            assert!(!seen[approach.index()]);
            seen[approach.index()] = true;
        }
    }
}
