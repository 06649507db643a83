//! Writes a small `u16` raster to a directory in tiles, edits it across tile boundaries, and reads it back.

#[cfg(feature = "ndarray")]
fn raster_tiles() -> Result<(), Box<dyn std::error::Error>> {
    use std::sync::Arc;

    use chunkarray::{
        array::{codec::BytesToBytesCodecTraits, Array, ArrayBuilder, DataType, FillValue},
        array_subset::ArraySubset,
        storage::{store::FilesystemStore, ReadableStorageTraits},
    };
    use rayon::iter::{IntoParallelIterator, ParallelIterator};

    let directory = tempfile::TempDir::new()?;
    let store = Arc::new(FilesystemStore::new(directory.path())?);

    let mut codecs: Vec<Box<dyn BytesToBytesCodecTraits>> = vec![];
    #[cfg(feature = "zstd")]
    codecs.push(Box::new(chunkarray::array::codec::ZstdCodec::new(3, false)));
    #[cfg(feature = "crc32c")]
    codecs.push(Box::new(chunkarray::array::codec::Crc32cCodec::new()));

    // A 6 x 9 raster in 3 x 4 tiles, so the last column of tiles is mostly outside the raster
    let mut array = ArrayBuilder::new(
        vec![6, 9],
        DataType::UInt16,
        vec![3, 4].try_into()?,
        FillValue::from(0u16),
    )
    .bytes_to_bytes_codecs(codecs)
    .build(store.clone(), "/survey/counts")?;
    array
        .attributes_mut()
        .insert("units".to_string(), "photons".into());
    array.store_metadata()?;

    // Each tile is written whole by its own task, so no tile is read back first
    let tiles = ArraySubset::new_with_shape(array.chunk_grid_shape());
    tiles
        .iter_indices()
        .collect::<Vec<_>>()
        .into_par_iter()
        .try_for_each(|tile| {
            let elements = array.chunk_subset(&tile)?.num_elements_usize();
            let value = u16::try_from(tile[0] * 10 + tile[1]).unwrap_or(u16::MAX);
            array.store_chunk_elements(&tile, vec![value; elements])
        })?;

    // A 2 x 5 patch straddles four tiles, each of which is merged with its stored contents
    let patch = ndarray::Array2::<u16>::from_shape_fn((2, 5), |(i, j)| {
        u16::try_from(1000 + 10 * i + j).unwrap_or(u16::MAX)
    })
    .into_dyn();
    array.store_array_subset_ndarray(&[2, 2], &patch.view())?;

    // Erased tiles read as the fill value
    array.erase_chunk(&[1, 2])?;
    drop(array);

    let readable: Arc<dyn ReadableStorageTraits> = store;
    let array = Array::open(readable, "/survey/counts")?;
    println!("{}", serde_json::to_string_pretty(array.metadata())?);
    println!(
        "raster:\n{}",
        array.retrieve_array_subset_ndarray::<u16>(&ArraySubset::new_with_shape(
            array.shape().to_vec()
        ))?
    );
    println!(
        "tile [0, 1]:\n{}",
        array.retrieve_chunk_ndarray::<u16>(&[0, 1])?
    );
    Ok(())
}

#[cfg(not(feature = "ndarray"))]
fn raster_tiles() -> Result<(), Box<dyn std::error::Error>> {
    panic!("the raster_tiles demo requires the ndarray feature")
}

fn main() {
    if let Err(err) = raster_tiles() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
