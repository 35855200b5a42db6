// Licensed under the Apache-2.0 license

#[cfg(test)]
mod test {
    use crate::test::{corrupt_header, corrupt_payload, init_logger, sealed_image, staged_flash};
    use bootloader_core::boot_flow::{boot, select_boot_image};
    use bootloader_core::flash::emulated_flash::{EmulatedFlash, FaultPlan};
    use bootloader_core::{
        validator, BootSelection, BootSource, FirmwareImage, ImageLauncher, SlotManager,
        ThreadExecutor, UcErrorCode,
    };
    use image_builder::FlashLayout;

    fn select(flash: &EmulatedFlash, layout: &FlashLayout) -> Result<BootSelection, UcErrorCode> {
        let manager = SlotManager::with_executor(
            flash,
            flash,
            &layout.update,
            ThreadExecutor::default(),
        )
        .unwrap();
        select_boot_image(&manager)
    }

    #[test]
    fn test_boot_prefers_newest_candidate() {
        init_logger();
        let layout = FlashLayout::default();
        let active = sealed_image(2, 0x4000);
        let slots = [
            sealed_image(4, 0x1000),
            sealed_image(6, 0x1000),
            sealed_image(6, 0x1200),
            sealed_image(1, 0x1000),
        ];
        let placed: Vec<(usize, &[u8])> = slots
            .iter()
            .enumerate()
            .map(|(slot, image)| (slot, image.as_slice()))
            .collect();
        let flash = staged_flash(&layout, Some(active.as_slice()), &placed);

        assert_eq!(
            select(&flash, &layout),
            Ok(BootSelection {
                version: 6,
                source: BootSource::Installed { slot: 1 }
            })
        );
        // A second boot keeps the freshly installed image.
        assert_eq!(
            select(&flash, &layout),
            Ok(BootSelection {
                version: 6,
                source: BootSource::Active
            })
        );
    }

    #[test]
    fn test_boot_never_downgrades() {
        init_logger();
        let layout = FlashLayout::default();
        let active = sealed_image(9, 0x800);
        let older = sealed_image(8, 0x800);
        let flash = staged_flash(&layout, Some(active.as_slice()), &[(0, older.as_slice())]);

        assert_eq!(
            select(&flash, &layout),
            Ok(BootSelection {
                version: 9,
                source: BootSource::Active
            })
        );
        assert_eq!(flash.stats().programs, 0);
        assert!(flash.stats().erases.is_empty());
    }

    #[test]
    fn test_boot_recovers_corrupt_active() {
        init_logger();
        let layout = FlashLayout::default();
        let active = sealed_image(9, 0x800);
        let older = sealed_image(3, 0x800);
        let flash = staged_flash(&layout, Some(active.as_slice()), &[(2, older.as_slice())]);
        corrupt_payload(&flash, layout.active_header_offset());

        assert_eq!(
            select(&flash, &layout),
            Ok(BootSelection {
                version: 3,
                source: BootSource::Installed { slot: 2 }
            })
        );
    }

    #[test]
    fn test_boot_without_any_valid_image() {
        init_logger();
        let layout = FlashLayout::default();
        let active = sealed_image(9, 0x800);
        let candidate = sealed_image(10, 0x800);
        let flash = staged_flash(
            &layout,
            Some(active.as_slice()),
            &[(0, candidate.as_slice())],
        );
        corrupt_header(&flash, layout.active_header_offset());
        corrupt_header(&flash, layout.slot_offset(0).unwrap());

        assert_eq!(select(&flash, &layout), Err(UcErrorCode::InvalidChecksum));
    }

    #[test]
    fn test_boot_storage_init_failure() {
        init_logger();
        let layout = FlashLayout::default();
        let active = sealed_image(1, 0x800);
        let flash = staged_flash(&layout, Some(active.as_slice()), &[]);
        flash.set_faults(FaultPlan {
            fail_init: true,
            ..Default::default()
        });

        assert_eq!(select(&flash, &layout), Err(UcErrorCode::CannotInit));
        assert!(flash.stats().reads.is_empty());
    }

    #[test]
    fn test_boot_keeps_active_when_upgrade_fails() {
        init_logger();
        let layout = FlashLayout::default();
        let active = sealed_image(1, 0x800);
        let candidate = sealed_image(2, 0x800);
        let flash = staged_flash(
            &layout,
            Some(active.as_slice()),
            &[(3, candidate.as_slice())],
        );
        flash.set_faults(FaultPlan {
            fail_erase: true,
            ..Default::default()
        });

        assert_eq!(
            select(&flash, &layout),
            Ok(BootSelection {
                version: 1,
                source: BootSource::Active
            })
        );
    }

    struct RecordingLauncher;

    impl ImageLauncher for RecordingLauncher {
        fn launch(&mut self, image: &FirmwareImage, selection: &BootSelection) -> ! {
            assert!(validator::is_valid(image));
            panic!("launched version {}", selection.version);
        }
    }

    #[test]
    #[should_panic(expected = "launched version 4")]
    fn test_boot_launches_installed_image() {
        init_logger();
        let layout = FlashLayout::default();
        let candidate = sealed_image(4, 0x800);
        let flash = staged_flash(&layout, None, &[(1, candidate.as_slice())]);
        let manager = SlotManager::new(&flash, &flash, &layout.update).unwrap();
        boot(&manager, &mut RecordingLauncher);
    }

    #[test]
    fn test_boot_returns_when_nothing_to_launch() {
        init_logger();
        let layout = FlashLayout::default();
        let flash = staged_flash(&layout, None, &[]);
        let manager = SlotManager::new(&flash, &flash, &layout.update).unwrap();
        assert_eq!(
            boot(&manager, &mut RecordingLauncher),
            UcErrorCode::InvalidHeader
        );
    }
}
