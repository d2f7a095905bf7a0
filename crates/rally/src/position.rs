use std::fmt;
use std::ops::{Add, Neg, Sub};

/// Integer cell coordinate inside a local area.
///
/// `y` is the vertical axis; rotations only touch `x` and `z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    /// Marks an empty slot. Never produced by a real placement.
    pub const INVALID: Position = Position {
        x: -1000,
        y: -1000,
        z: -1000,
    };

    pub const ZERO: Position = Position { x: 0, y: 0, z: 0 };

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::INVALID
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Position) -> Position {
        Position {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl Neg for Position {
    type Output = Position;

    fn neg(self) -> Position {
        Position {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "({}, {}, {})", self.x, self.y, self.z)
        } else {
            f.write_str("(invalid)")
        }
    }
}

/// Cardinal facing of a structure. `North` is the unrotated frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Rotation {
    #[default]
    North,
    East,
    South,
    West,
}

impl Rotation {
    pub const IDENTITY: Rotation = Rotation::North;

    /// Rotates an offset about the origin, clockwise in quarter turns.
    pub fn rotate(self, offset: Position) -> Position {
        let Position { x, y, z } = offset;
        match self {
            Self::North => Position { x, y, z },
            Self::East => Position { x: z, y, z: -x },
            Self::South => Position { x: -x, y, z: -z },
            Self::West => Position { x: -z, y, z: x },
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            Self::North => "north",
            Self::East => "east",
            Self::South => "south",
            Self::West => "west",
        }
    }

    pub fn parse_token(token: &str) -> Option<Self> {
        match token {
            "north" | "0" => Some(Self::North),
            "east" | "90" => Some(Self::East),
            "south" | "180" => Some(Self::South),
            "west" | "270" => Some(Self::West),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_sentinel_is_not_valid() {
        assert!(!Position::INVALID.is_valid());
        assert!(Position::ZERO.is_valid());
        assert!(Position::new(-1000, -1000, -999).is_valid());
        assert_eq!(Position::default(), Position::INVALID);
    }

    #[test]
    fn south_negates_both_horizontal_axes() {
        let rotated = Rotation::South.rotate(Position::new(1, 2, 3));
        assert_eq!(rotated, Position::new(-1, 2, -3));
    }

    #[test]
    fn four_quarter_turns_return_to_start() {
        let offset = Position::new(3, 0, -7);
        let mut current = offset;
        for _ in 0..4 {
            current = Rotation::East.rotate(current);
        }
        assert_eq!(current, offset);
    }

    #[test]
    fn east_then_west_cancel() {
        let offset = Position::new(4, 1, 9);
        assert_eq!(Rotation::West.rotate(Rotation::East.rotate(offset)), offset);
    }

    #[test]
    fn tokens_name_every_rotation() {
        for rotation in [
            Rotation::North,
            Rotation::East,
            Rotation::South,
            Rotation::West,
        ] {
            assert_eq!(Rotation::parse_token(rotation.as_token()), Some(rotation));
        }
        assert_eq!(Rotation::parse_token("180"), Some(Rotation::South));
        assert_eq!(Rotation::parse_token("sideways"), None);
    }
}
