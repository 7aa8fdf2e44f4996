//! 将体数据写为 MetaImage 单文件 (`.mha`), 作为外部分割程序的输入.

use super::VolumeSource;
use crate::{NeedleError, NeedleResult};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use itertools::Itertools;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// 将 `volume` 的体素写入 `path`. 父目录不存在时会被创建.
///
/// 与宿主的做法一致, 文件只携带间距和原点, 不携带方向矩阵
/// (`TransformMatrix` 恒为单位阵); 方向由种子点的坐标转换负责.
/// `compress` 为真时体素数据以 zlib 压缩.
pub fn write_metaimage<V: VolumeSource + ?Sized>(
    path: &Path,
    volume: &V,
    compress: bool,
) -> NeedleResult<()> {
    let io_err = |source| NeedleError::Io {
        path: path.to_owned(),
        source,
    };

    let grid = volume.voxel_grid();
    let (k, j, i) = grid.dim();

    let mut raw = Vec::with_capacity(grid.len() * 4);
    // 按逻辑顺序迭代, i 变化最快.
    for v in grid.iter() {
        raw.extend_from_slice(&v.to_le_bytes());
    }

    let payload = if compress {
        let mut e = ZlibEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::default());
        e.write_all(&raw).map_err(io_err)?;
        e.finish().map_err(io_err)?
    } else {
        raw
    };

    let mut header = vec![
        "ObjectType = Image".to_string(),
        "NDims = 3".to_string(),
        "BinaryData = True".to_string(),
        "BinaryDataByteOrderMSB = False".to_string(),
    ];
    if compress {
        header.push("CompressedData = True".to_string());
        header.push(format!("CompressedDataSize = {}", payload.len()));
    } else {
        header.push("CompressedData = False".to_string());
    }
    header.push("TransformMatrix = 1 0 0 0 1 0 0 0 1".to_string());
    header.push(format!("Offset = {}", volume.origin().iter().join(" ")));
    header.push("CenterOfRotation = 0 0 0".to_string());
    header.push(format!("ElementSpacing = {}", volume.spacing().iter().join(" ")));
    header.push(format!("DimSize = {i} {j} {k}"));
    header.push("ElementType = MET_FLOAT".to_string());
    // 必须是最后一个字段.
    header.push("ElementDataFile = LOCAL".to_string());

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let mut w = BufWriter::new(File::create(path).map_err(io_err)?);
    for line in header {
        writeln!(w, "{line}").map_err(io_err)?;
    }
    w.write_all(&payload).map_err(io_err)?;
    w.flush().map_err(io_err)?;

    log::debug!(
        "staged {}x{}x{} volume at {} ({} payload bytes)",
        i,
        j,
        k,
        path.display(),
        payload.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::DirectionCosines;
    use crate::volume::Volume;
    use flate2::read::ZlibDecoder;
    use ndarray::Array3;
    use std::io::Read;

    fn volume() -> Volume {
        let data = Array3::from_shape_fn((2, 3, 4), |(k, j, i)| (k * 100 + j * 10 + i) as f32);
        Volume::new(
            data,
            [0.5, 0.75, 2.0],
            [-10.0, 20.5, 3.0],
            DirectionCosines::identity(),
        )
        .unwrap()
    }

    /// 拆分出 header 文本和数据部分.
    fn split(bytes: &[u8]) -> (String, &[u8]) {
        const LAST: &[u8] = b"ElementDataFile = LOCAL\n";
        let pos = bytes
            .windows(LAST.len())
            .position(|w| w == LAST)
            .expect("header terminator missing");
        let end = pos + LAST.len();
        (String::from_utf8(bytes[..end].to_vec()).unwrap(), &bytes[end..])
    }

    fn as_f32(raw: &[u8]) -> Vec<f32> {
        raw.chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    #[test]
    fn test_write_raw() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("input.mha");
        write_metaimage(&path, &volume(), false).unwrap();

        let bytes = fs::read(&path).unwrap();
        let (header, data) = split(&bytes);
        assert!(header.contains("DimSize = 4 3 2\n"));
        assert!(header.contains("ElementSpacing = 0.5 0.75 2\n"));
        assert!(header.contains("Offset = -10 20.5 3\n"));
        assert!(header.contains("CompressedData = False\n"));

        let voxels = as_f32(data);
        assert_eq!(voxels.len(), 24);
        // i 变化最快.
        assert_eq!(&voxels[..5], &[0.0, 1.0, 2.0, 3.0, 10.0]);
        assert_eq!(voxels[23], 123.0);
    }

    #[test]
    fn test_write_compressed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.mha");
        write_metaimage(&path, &volume(), true).unwrap();

        let bytes = fs::read(&path).unwrap();
        let (header, data) = split(&bytes);
        assert!(header.contains("CompressedData = True\n"));
        assert!(header.contains(&format!("CompressedDataSize = {}\n", data.len())));

        let mut raw = vec![];
        ZlibDecoder::new(data).read_to_end(&mut raw).unwrap();
        let voxels = as_f32(&raw);
        assert_eq!(voxels.len(), 24);
        assert_eq!(voxels[13], 101.0);
    }
}
