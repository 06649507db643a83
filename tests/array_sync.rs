use std::sync::Arc;

use chunkarray::array::{Array, ArrayBuilder, DataType, ErrorKind, FillValue};
use chunkarray::array_subset::ArraySubset;
use chunkarray::storage::store::MemoryStore;

#[rustfmt::skip]
fn array_sync_read(array: &Array<MemoryStore>) -> Result<(), Box<dyn std::error::Error>> {
    assert_eq!(array.data_type(), &DataType::UInt8);
    assert_eq!(array.fill_value().as_ne_bytes(), &[0u8]);
    assert_eq!(array.shape(), &[4, 4]);
    assert_eq!(array.chunk_shape(&[0, 0])?, vec![2, 2].try_into()?);
    assert_eq!(array.chunk_grid_shape(), &[2, 2]);

    // 1  2 | 3  4
    // 5  6 | 7  8
    // -----|-----
    // 9 10 | 0  0
    // 0  0 | 0  0
    array.store_chunk(&[0, 0], vec![1, 2, 0, 0])?;
    array.store_chunk(&[0, 1], vec![3, 4, 7, 8])?;
    array.store_array_subset(&ArraySubset::new_with_ranges(&[1..3, 0..2]), vec![5, 6, 9, 10])?;

    assert!(array.retrieve_chunk(&[0, 0, 0]).is_err());
    assert_eq!(array.retrieve_chunk(&[0, 0])?, vec![1, 2, 5, 6]);
    assert_eq!(array.retrieve_chunk(&[0, 1])?, vec![3, 4, 7, 8]);
    assert_eq!(array.retrieve_chunk(&[1, 0])?, vec![9, 10, 0, 0]);
    assert_eq!(array.retrieve_chunk(&[1, 1])?, vec![0, 0, 0, 0]);

    assert_eq!(array.retrieve_chunk_if_exists(&[0, 0])?, Some(vec![1, 2, 5, 6]));
    assert_eq!(array.retrieve_chunk_if_exists(&[1, 0])?, Some(vec![9, 10, 0, 0]));
    assert_eq!(array.retrieve_chunk_if_exists(&[1, 1])?, None);

    assert!(array.retrieve_chunk_subset(&[0, 0], &ArraySubset::new_with_ranges(&[0..2])).is_err());
    assert!(array.retrieve_chunk_subset(&[0, 0], &ArraySubset::new_with_ranges(&[0..3, 0..3])).is_err());
    assert_eq!(array.retrieve_chunk_subset(&[0, 0], &ArraySubset::new_with_ranges(&[0..2, 0..2]))?, vec![1, 2, 5, 6]);
    assert_eq!(array.retrieve_chunk_subset(&[0, 0], &ArraySubset::new_with_ranges(&[0..1, 0..2]))?, vec![1, 2]);
    assert_eq!(array.retrieve_chunk_subset(&[0, 0], &ArraySubset::new_with_ranges(&[0..2, 1..2]))?, vec![2, 6]);

    assert!(array.retrieve_array_subset(&ArraySubset::new_with_ranges(&[0..4])).is_err());
    assert_eq!(array.retrieve_array_subset(&ArraySubset::new_with_ranges(&[0..0, 0..0]))?, Vec::<u8>::new());
    assert_eq!(array.retrieve_array_subset(&ArraySubset::new_with_ranges(&[0..2, 0..2]))?, vec![1, 2, 5, 6]);
    assert_eq!(array.retrieve_array_subset(&ArraySubset::new_with_ranges(&[0..4, 0..4]))?, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 0, 0, 0, 0, 0, 0]);
    assert_eq!(array.retrieve_array_subset(&ArraySubset::new_with_ranges(&[1..3, 1..3]))?, vec![6, 7, 10, 0]);
    assert_eq!(array.par_retrieve_array_subset(&ArraySubset::new_with_ranges(&[1..3, 1..3]))?, vec![6, 7, 10, 0]);
    assert_eq!(array.retrieve_array_subset(&ArraySubset::new_with_ranges(&[0..5, 0..5])).unwrap_err().kind(), ErrorKind::OutOfBounds);

    #[cfg(feature = "ndarray")]
    {
        assert_eq!(array.retrieve_chunk_ndarray::<u8>(&[0, 0])?, ndarray::array![[1, 2], [5, 6]].into_dyn());
        assert_eq!(array.retrieve_array_subset_ndarray::<u8>(&ArraySubset::new_with_ranges(&[0..2, 1..4]))?, ndarray::array![[2, 3, 4], [6, 7, 8]].into_dyn());
        assert!(array.retrieve_array_subset_ndarray::<u16>(&ArraySubset::new_with_ranges(&[0..2, 0..2])).is_err());
    }

    Ok(())
}

#[test]
fn array_sync_read_uncompressed() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let array = ArrayBuilder::new(
        vec![4, 4],
        DataType::UInt8,
        vec![2, 2].try_into()?,
        FillValue::from(0u8),
    )
    .build(store, "/array")?;
    array_sync_read(&array)
}

#[cfg(all(feature = "gzip", feature = "crc32c"))]
#[test]
fn array_sync_read_compressed() -> Result<(), Box<dyn std::error::Error>> {
    use chunkarray::array::codec::{Crc32cCodec, GzipCodec};

    let store = Arc::new(MemoryStore::new());
    let array = ArrayBuilder::new(
        vec![4, 4],
        DataType::UInt8,
        vec![2, 2].try_into()?,
        FillValue::from(0u8),
    )
    .bytes_to_bytes_codecs(vec![
        Box::new(GzipCodec::new(5)?),
        Box::new(Crc32cCodec::new()),
    ])
    .build(store, "/array")?;
    array_sync_read(&array)
}

#[cfg(feature = "zstd")]
#[test]
fn array_sync_read_zstd() -> Result<(), Box<dyn std::error::Error>> {
    use chunkarray::array::codec::ZstdCodec;

    let store = Arc::new(MemoryStore::new());
    let array = ArrayBuilder::new(
        vec![4, 4],
        DataType::UInt8,
        vec![2, 2].try_into()?,
        FillValue::from(0u8),
    )
    .bytes_to_bytes_codecs(vec![Box::new(ZstdCodec::new(3, true))])
    .build(store, "/array")?;
    array_sync_read(&array)
}

#[test]
fn array_float32_partial_write() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let array = ArrayBuilder::new(
        vec![4, 4],
        DataType::Float32,
        vec![2, 2].try_into()?,
        FillValue::from(0.0f32),
    )
    .build(store, "/")?;
    array.store_metadata()?;

    array.store_array_subset_elements::<f32>(
        &ArraySubset::new_with_ranges(&[1..3, 1..3]),
        vec![-1.0, -2.0, -3.0, -4.0],
    )?;
    assert_eq!(
        array.retrieve_chunk_elements::<f32>(&[0, 0])?,
        vec![0.0, 0.0, 0.0, -1.0]
    );
    assert_eq!(
        array.retrieve_chunk_elements::<f32>(&[0, 1])?,
        vec![0.0, 0.0, -2.0, 0.0]
    );
    assert_eq!(
        array.retrieve_chunk_elements::<f32>(&[1, 0])?,
        vec![0.0, -3.0, 0.0, 0.0]
    );
    assert_eq!(
        array.retrieve_chunk_elements::<f32>(&[1, 1])?,
        vec![-4.0, 0.0, 0.0, 0.0]
    );
    Ok(())
}

#[test]
fn array_single_element_write() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let array = ArrayBuilder::new(
        vec![3, 3, 3],
        DataType::Int32,
        vec![2, 2, 2].try_into()?,
        FillValue::from(-7i32),
    )
    .build(store, "/")?;

    let element = ArraySubset::new_with_ranges(&[2..3, 1..2, 0..1]);
    array.store_array_subset_elements::<i32>(&element, vec![42])?;
    assert_eq!(array.retrieve_array_subset_elements::<i32>(&element)?, vec![42]);

    // The remainder of the chunk is the fill value
    let chunk = array.retrieve_chunk_elements::<i32>(&[1, 0, 0])?;
    assert_eq!(chunk.iter().filter(|&&v| v == 42).count(), 1);
    assert_eq!(chunk.iter().filter(|&&v| v == -7).count(), 7);
    Ok(())
}

#[test]
fn array_fill_value_never_written() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let array = ArrayBuilder::new(
        vec![5, 3],
        DataType::UInt16,
        vec![2, 2].try_into()?,
        FillValue::from(513u16),
    )
    .build(store, "/")?;

    let all = ArraySubset::new_with_shape(array.shape().to_vec());
    assert_eq!(array.retrieve_array_subset_elements::<u16>(&all)?, vec![513u16; 15]);
    for chunk_indices in array.chunks_in_array_subset(&all)?.iter_indices() {
        assert!(array.retrieve_chunk_if_exists(&chunk_indices)?.is_none());
        assert_eq!(array.retrieve_chunk_elements::<u16>(&chunk_indices)?, vec![513u16; 4]);
    }
    Ok(())
}

#[test]
fn array_boundary_truncation() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let array = ArrayBuilder::new(
        vec![5, 5],
        DataType::UInt8,
        vec![2, 2].try_into()?,
        FillValue::from(0u8),
    )
    .build(store, "/")?;
    assert_eq!(array.chunk_grid_shape(), vec![3, 3]);

    // Boundary chunks have full size payloads
    assert_eq!(array.chunk_size_bytes(&[2, 2])?, 4);
    assert_eq!(
        array.chunk_subset_bounded(&[2, 2])?,
        ArraySubset::new_with_ranges(&[4..5, 4..5])
    );

    let all = ArraySubset::new_with_shape(vec![5, 5]);
    let elements: Vec<u8> = (1..=25).collect();
    array.store_array_subset_elements::<u8>(&all, elements.clone())?;
    assert_eq!(array.retrieve_array_subset_elements::<u8>(&all)?, elements);

    // The out of bounds elements of a boundary chunk are never returned by a subset read
    assert_eq!(array.retrieve_chunk(&[2, 2])?, vec![25, 0, 0, 0]);
    assert_eq!(
        array.retrieve_chunk(&[3, 0]).unwrap_err().kind(),
        ErrorKind::OutOfRange
    );
    Ok(())
}

#[test]
fn array_merge_preserves_untouched() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let array = ArrayBuilder::new(
        vec![6],
        DataType::Int8,
        vec![3].try_into()?,
        FillValue::from(9i8),
    )
    .build(store, "/")?;
    array.store_array_subset_elements::<i8>(&ArraySubset::new_with_ranges(&[1..5]), vec![0; 4])?;
    array.store_array_subset_elements::<i8>(&ArraySubset::new_with_ranges(&[2..4]), vec![1; 2])?;
    array.store_array_subset_elements::<i8>(&ArraySubset::new_with_ranges(&[2..3]), vec![2])?;
    assert_eq!(
        array.retrieve_array_subset_elements::<i8>(&ArraySubset::new_with_ranges(&[0..6]))?,
        vec![9, 0, 2, 1, 0, 9]
    );
    Ok(())
}

#[test]
fn array_concurrent_partial_writes_same_chunk() -> Result<(), Box<dyn std::error::Error>> {
    use rayon::prelude::*;

    let store = Arc::new(MemoryStore::new());
    let array = ArrayBuilder::new(
        vec![64],
        DataType::UInt32,
        vec![64].try_into()?,
        FillValue::from(0u32),
    )
    .build(store, "/")?;

    (0..64u64).into_par_iter().try_for_each(|i| {
        array.store_array_subset_elements::<u32>(
            &ArraySubset::new_with_ranges(&[i..i + 1]),
            vec![u32::try_from(i).unwrap() + 1],
        )
    })?;
    let expected: Vec<u32> = (1..=64).collect();
    assert_eq!(array.retrieve_chunk_elements::<u32>(&[0])?, expected);
    Ok(())
}

#[test]
fn array_retrieve_into_buffers() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let array = ArrayBuilder::new(
        vec![4, 4],
        DataType::UInt8,
        vec![2, 2].try_into()?,
        FillValue::from(3u8),
    )
    .build(store, "/")?;

    let mut buffer = [0u8; 4];
    assert_eq!(array.retrieve_chunk_into(&[1, 1], &mut buffer)?, 4);
    assert_eq!(buffer, [3u8; 4]);
    let mut small = [0u8; 2];
    assert_eq!(
        array.retrieve_chunk_into(&[1, 1], &mut small).unwrap_err().kind(),
        ErrorKind::BufferTooSmall
    );

    let subset = ArraySubset::new_with_ranges(&[1..3, 0..3]);
    let mut buffer = vec![0u8; 6];
    array.retrieve_array_subset_into(&subset, &mut buffer)?;
    assert_eq!(buffer, vec![3u8; 6]);
    let mut buffer = vec![0u8; 7];
    assert_eq!(
        array
            .retrieve_array_subset_into(&subset, &mut buffer)
            .unwrap_err()
            .kind(),
        ErrorKind::ShapeMismatch
    );
    Ok(())
}
