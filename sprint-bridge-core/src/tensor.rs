//! Dense multidimensional arrays carried in data messages

use std::fmt;

use bytemuck::Pod;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Element type of a tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DType {
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 32-bit unsigned integer
    UInt32,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::Float32 => "float32",
            DType::Float64 => "float64",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::UInt32 => "uint32",
        };
        f.write_str(name)
    }
}

/// Typed element storage, row-major
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementBuffer {
    /// 32-bit float elements
    Float32(Vec<f32>),
    /// 64-bit float elements
    Float64(Vec<f64>),
    /// 32-bit signed integer elements
    Int32(Vec<i32>),
    /// 64-bit signed integer elements
    Int64(Vec<i64>),
    /// 32-bit unsigned integer elements
    UInt32(Vec<u32>),
}

impl ElementBuffer {
    /// Element type of this buffer
    pub fn dtype(&self) -> DType {
        match self {
            ElementBuffer::Float32(_) => DType::Float32,
            ElementBuffer::Float64(_) => DType::Float64,
            ElementBuffer::Int32(_) => DType::Int32,
            ElementBuffer::Int64(_) => DType::Int64,
            ElementBuffer::UInt32(_) => DType::UInt32,
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            ElementBuffer::Float32(v) => v.len(),
            ElementBuffer::Float64(v) => v.len(),
            ElementBuffer::Int32(v) => v.len(),
            ElementBuffer::Int64(v) => v.len(),
            ElementBuffer::UInt32(v) => v.len(),
        }
    }

    /// Whether the buffer holds no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw native-endian bytes of the elements
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ElementBuffer::Float32(v) => bytemuck::cast_slice(v),
            ElementBuffer::Float64(v) => bytemuck::cast_slice(v),
            ElementBuffer::Int32(v) => bytemuck::cast_slice(v),
            ElementBuffer::Int64(v) => bytemuck::cast_slice(v),
            ElementBuffer::UInt32(v) => bytemuck::cast_slice(v),
        }
    }
}

/// Trait for types that can be used in tensors
pub trait TensorType: Pod + Send + Sync + 'static {
    /// Wrap a vector of elements into a typed buffer
    fn into_buffer(data: Vec<Self>) -> ElementBuffer;

    /// Borrow the elements if the buffer holds this type
    fn view(buffer: &ElementBuffer) -> Option<&[Self]>;
}

macro_rules! impl_tensor_type {
    ($ty:ty, $variant:ident) => {
        impl TensorType for $ty {
            fn into_buffer(data: Vec<Self>) -> ElementBuffer {
                ElementBuffer::$variant(data)
            }

            fn view(buffer: &ElementBuffer) -> Option<&[Self]> {
                match buffer {
                    ElementBuffer::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

impl_tensor_type!(f32, Float32);
impl_tensor_type!(f64, Float64);
impl_tensor_type!(i32, Int32);
impl_tensor_type!(i64, Int64);
impl_tensor_type!(u32, UInt32);

/// A dense multidimensional tensor
///
/// Elements are stored contiguously in row-major order. A feature matrix for
/// one segment has shape `[input_dim, frames]`; a target alignment has shape
/// `[frames]`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseTensor {
    /// Shape of the tensor (dimensions)
    shape: Vec<usize>,

    /// Element storage
    data: ElementBuffer,
}

impl DenseTensor {
    /// Create a zero-filled tensor with the given shape
    pub fn zeros<T: TensorType>(shape: Vec<usize>) -> Self {
        let size = shape.iter().product();
        Self {
            shape,
            data: T::into_buffer(vec![<T as bytemuck::Zeroable>::zeroed(); size]),
        }
    }

    /// Create a tensor from a vector
    pub fn from_vec<T: TensorType>(data: Vec<T>, shape: Vec<usize>) -> Result<Self> {
        let expected_size: usize = shape.iter().product();
        if data.len() != expected_size {
            return Err(Error::InvalidArgument(format!(
                "Data length {} does not match shape product {}",
                data.len(),
                expected_size
            )));
        }

        Ok(Self {
            shape,
            data: T::into_buffer(data),
        })
    }

    /// Create a `[rows, cols]` matrix from row-major data
    pub fn matrix<T: TensorType>(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        Self::from_vec(data, vec![rows, cols])
    }

    /// Create a one-dimensional tensor
    pub fn vector<T: TensorType>(data: Vec<T>) -> Self {
        Self {
            shape: vec![data.len()],
            data: T::into_buffer(data),
        }
    }

    /// Get the shape of this tensor
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the number of dimensions in this tensor
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Size of the leading dimension, or `None` for a scalar
    pub fn rows(&self) -> Option<usize> {
        self.shape.first().copied()
    }

    /// Get the total number of elements in this tensor
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if this tensor is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Element type of this tensor
    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    /// Borrow the elements as `T`, or `None` if the element type differs
    pub fn as_slice<T: TensorType>(&self) -> Option<&[T]> {
        T::view(&self.data)
    }

    /// Raw native-endian element bytes
    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_bytes()
    }

    /// Check that the shape agrees with the number of stored elements
    ///
    /// Tensors built through the constructors always pass; this guards
    /// tensors that arrive over the wire.
    pub fn validate(&self) -> Result<()> {
        let expected: usize = self.shape.iter().product();
        if expected != self.data.len() {
            return Err(Error::Protocol(format!(
                "tensor shape {:?} needs {} elements, buffer has {}",
                self.shape,
                expected,
                self.data.len()
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for DenseTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DenseTensor<{}>{{ shape: {:?}, size: {} }}",
            self.dtype(),
            self.shape,
            self.len()
        )
    }
}

impl fmt::Debug for ElementBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementBuffer<{}>[{}]", self.dtype(), self.len())
    }
}
