// Licensed under the Apache-2.0 license

#[cfg(test)]
mod test {
    use crate::test::{init_logger, payload};
    use bootloader_core::boot_flow::select_boot_image;
    use bootloader_core::flash::emulated_flash::EmulatedFlash;
    use bootloader_core::{validator, BootSource, SlotManager, ThreadExecutor, UcErrorCode};
    use image_builder::{
        firmware_image_create, firmware_image_verify, flash_layout_create, FlashLayout,
    };
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn create_image(dir: &Path, name: &str, version: u64, len: usize) -> PathBuf {
        let payload_path = dir.join(format!("{}.payload", name));
        fs::write(&payload_path, payload(version, len)).unwrap();
        let image_path = dir.join(format!("{}.img", name));
        firmware_image_create(
            payload_path.to_str().unwrap(),
            version,
            image_path.to_str().unwrap(),
        )
        .expect("Failed to create firmware image");
        image_path
    }

    #[test]
    fn test_builder_images_pass_bootloader_validation() {
        init_logger();
        let dir = TempDir::new().unwrap();
        let layout = FlashLayout::default();
        let active = create_image(dir.path(), "active", 1, 0x2345);
        let update = create_image(dir.path(), "update", 2, 0x1234);
        let flash_path = dir.path().join("flash.bin");

        flash_layout_create(
            &layout,
            Some(active.to_str().unwrap()),
            &[(2, update.to_str().unwrap().to_string())],
            flash_path.to_str().unwrap(),
        )
        .unwrap();

        let flash = EmulatedFlash::from_file(
            &flash_path,
            layout.device.capacity,
            layout.device.erase_size,
        )
        .unwrap();
        let manager = SlotManager::new(&flash, &flash, &layout.update).unwrap();
        assert_eq!(
            validator::validate(&manager.active_image()),
            UcErrorCode::None
        );
        assert_eq!(
            validator::validate(&manager.image_at(2).unwrap()),
            UcErrorCode::None
        );
        for slot in [0, 1, 3] {
            assert_eq!(
                validator::validate(&manager.image_at(slot).unwrap()),
                UcErrorCode::InvalidHeader
            );
        }
    }

    #[test]
    fn test_boot_updates_flash_file() {
        init_logger();
        let dir = TempDir::new().unwrap();
        let layout = FlashLayout::default();
        let active = create_image(dir.path(), "active", 3, 0x800);
        let update = create_image(dir.path(), "update", 5, 0x9000);
        let flash_path = dir.path().join("flash.bin");
        flash_layout_create(
            &layout,
            Some(active.to_str().unwrap()),
            &[(0, update.to_str().unwrap().to_string())],
            flash_path.to_str().unwrap(),
        )
        .unwrap();

        {
            let flash = EmulatedFlash::from_file(
                &flash_path,
                layout.device.capacity,
                layout.device.erase_size,
            )
            .unwrap();
            let manager = SlotManager::with_executor(
                &flash,
                &flash,
                &layout.update,
                ThreadExecutor::default(),
            )
            .unwrap();
            let selection = select_boot_image(&manager).unwrap();
            assert_eq!(selection.source, BootSource::Installed { slot: 0 });
            flash.save_to_file(&flash_path).unwrap();
        }

        let header =
            firmware_image_verify(flash_path.to_str().unwrap(), layout.active_header_offset())
                .unwrap();
        assert_eq!(header.firmware_version(), 5);
        assert_eq!(header.payload_size(), 0x9000);

        let flash = fs::read(&flash_path).unwrap();
        let update = fs::read(&update).unwrap();
        let start = layout.active_header_offset();
        assert_eq!(&flash[start..start + update.len()], update.as_slice());
    }

    #[test]
    fn test_short_flash_file_is_padded_erased() {
        let dir = TempDir::new().unwrap();
        let layout = FlashLayout::default();
        let flash_path = dir.path().join("short.bin");
        fs::write(&flash_path, [0u8; 16]).unwrap();

        let flash = EmulatedFlash::from_file(
            &flash_path,
            layout.device.capacity,
            layout.device.erase_size,
        )
        .unwrap();
        assert_eq!(flash.contents(0..16), vec![0u8; 16]);
        assert!(flash.contents(16..0x100).iter().all(|b| *b == 0xff));

        fs::write(&flash_path, vec![0u8; layout.device.capacity + 1]).unwrap();
        assert!(EmulatedFlash::from_file(
            &flash_path,
            layout.device.capacity,
            layout.device.erase_size
        )
        .is_err());
    }
}
