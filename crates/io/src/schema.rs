/// One per-vertex field as laid out in the binary body.
///
/// Every tag has a fixed byte width. Fields whose names are not recognized
/// resolve to a `Skip*` tag of the same width so the body decoder still
/// steps over them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldTag {
    R8,
    G8,
    B8,
    A8,
    R16,
    G16,
    B16,
    A16,
    SingleX,
    SingleY,
    SingleZ,
    SingleNx,
    SingleNy,
    SingleNz,
    DoubleX,
    DoubleY,
    DoubleZ,
    Skip8,
    Skip16,
    Skip32,
    Skip64,
}

impl FieldTag {
    pub fn width(self) -> usize {
        match self {
            FieldTag::R8 | FieldTag::G8 | FieldTag::B8 | FieldTag::A8 | FieldTag::Skip8 => 1,
            FieldTag::R16 | FieldTag::G16 | FieldTag::B16 | FieldTag::A16 | FieldTag::Skip16 => 2,
            FieldTag::SingleX
            | FieldTag::SingleY
            | FieldTag::SingleZ
            | FieldTag::SingleNx
            | FieldTag::SingleNy
            | FieldTag::SingleNz
            | FieldTag::Skip32 => 4,
            FieldTag::DoubleX | FieldTag::DoubleY | FieldTag::DoubleZ | FieldTag::Skip64 => 8,
        }
    }

    /// Resolve a `property <ty> <name>` pair.
    pub fn resolve(ty: &str, name: &str) -> Result<Self, ResolveError> {
        let width = WidthClass::from_type(ty).ok_or(ResolveError::UnsupportedType)?;
        let semantic = Semantic::from_name(name);
        semantic.with_width(width).ok_or(ResolveError::WidthMismatch)
    }
}

/// Why a property declaration could not become a [`FieldTag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    UnsupportedType,
    WidthMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WidthClass {
    One,
    Two,
    Four,
    Eight,
}

impl WidthClass {
    fn from_type(ty: &str) -> Option<Self> {
        match ty {
            "char" | "uchar" | "int8" | "uint8" => Some(WidthClass::One),
            "short" | "ushort" | "int16" | "uint16" => Some(WidthClass::Two),
            "int" | "uint" | "float" | "int32" | "uint32" | "float32" => Some(WidthClass::Four),
            "int64" | "uint64" | "double" | "float64" => Some(WidthClass::Eight),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Semantic {
    Red,
    Green,
    Blue,
    Alpha,
    X,
    Y,
    Z,
    Nx,
    Ny,
    Nz,
    Raw,
}

impl Semantic {
    fn from_name(name: &str) -> Self {
        match name {
            "red" => Semantic::Red,
            "green" => Semantic::Green,
            "blue" => Semantic::Blue,
            "alpha" => Semantic::Alpha,
            "x" => Semantic::X,
            "y" => Semantic::Y,
            "z" => Semantic::Z,
            "nx" => Semantic::Nx,
            "ny" => Semantic::Ny,
            "nz" => Semantic::Nz,
            _ => Semantic::Raw,
        }
    }

    fn with_width(self, width: WidthClass) -> Option<FieldTag> {
        use Semantic::*;
        use WidthClass::*;
        let tag = match (self, width) {
            (Raw, One) => FieldTag::Skip8,
            (Raw, Two) => FieldTag::Skip16,
            (Raw, Four) => FieldTag::Skip32,
            (Raw, Eight) => FieldTag::Skip64,
            (Red, One) => FieldTag::R8,
            (Green, One) => FieldTag::G8,
            (Blue, One) => FieldTag::B8,
            (Alpha, One) => FieldTag::A8,
            (Red, Two) => FieldTag::R16,
            (Green, Two) => FieldTag::G16,
            (Blue, Two) => FieldTag::B16,
            (Alpha, Two) => FieldTag::A16,
            (X, Four) => FieldTag::SingleX,
            (Y, Four) => FieldTag::SingleY,
            (Z, Four) => FieldTag::SingleZ,
            (Nx, Four) => FieldTag::SingleNx,
            (Ny, Four) => FieldTag::SingleNy,
            (Nz, Four) => FieldTag::SingleNz,
            (X, Eight) => FieldTag::DoubleX,
            (Y, Eight) => FieldTag::DoubleY,
            (Z, Eight) => FieldTag::DoubleZ,
            _ => return None,
        };
        Some(tag)
    }
}

/// Ordered on-disk field layout of one vertex record plus the declared
/// vertex count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub fields: Vec<FieldTag>,
    pub vertex_count: u64,
}

impl Schema {
    /// Bytes per vertex record.
    pub fn stride(&self) -> usize {
        self.fields.iter().map(|f| f.width()).sum()
    }
}
