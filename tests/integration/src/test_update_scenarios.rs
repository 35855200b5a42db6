// Licensed under the Apache-2.0 license

#[cfg(test)]
mod test {
    use crate::test::{corrupt_header, corrupt_payload, init_logger, sealed_image, staged_flash};
    use bootloader_core::{validator, SlotManager, SlotSelection, ThreadExecutor, UcErrorCode};
    use image_builder::FlashLayout;

    #[test]
    fn test_upgrade_skips_equal_version_with_bad_hash() {
        init_logger();
        let layout = FlashLayout::default();
        let active = sealed_image(5, 0x3000);
        let slot0 = sealed_image(5, 0x2000);
        let slot1 = sealed_image(7, 0x5000);
        let flash = staged_flash(
            &layout,
            Some(active.as_slice()),
            &[(0, slot0.as_slice()), (1, slot1.as_slice())],
        );
        corrupt_payload(&flash, layout.slot_offset(0).unwrap());

        let manager = SlotManager::with_executor(
            &flash,
            &flash,
            &layout.update,
            ThreadExecutor::default(),
        )
        .unwrap();
        let active_image = manager.active_image();
        assert_eq!(validator::validate(&active_image), UcErrorCode::None);
        assert_eq!(validator::version(&active_image), Some(5));
        assert_eq!(
            validator::validate(&manager.image_at(0).unwrap()),
            UcErrorCode::HashInvalid
        );

        let newer = manager.find_newer_valid_candidate(&active_image);
        assert_eq!(
            newer,
            Some(SlotSelection {
                index: 1,
                version: 7
            })
        );
        assert_eq!(
            manager.install(1, manager.active_header_offset()),
            UcErrorCode::None
        );
        assert_eq!(validator::validate(&active_image), UcErrorCode::None);
        assert_eq!(validator::version(&active_image), Some(7));

        // Candidate slots are never written by an install.
        let slot1_offset = layout.slot_offset(1).unwrap();
        assert_eq!(
            flash.contents(slot1_offset..slot1_offset + slot1.len()),
            slot1
        );
        // Once upgraded there is nothing newer left.
        assert_eq!(manager.find_newer_valid_candidate(&active_image), None);
    }

    #[test]
    fn test_recovery_takes_first_valid_slot() {
        init_logger();
        let layout = FlashLayout::default();
        let active = sealed_image(6, 0x1000);
        let slot0 = sealed_image(8, 0x1000);
        let slot1 = sealed_image(3, 0x1800);
        let slot2 = sealed_image(9, 0x1800);
        let flash = staged_flash(
            &layout,
            Some(active.as_slice()),
            &[
                (0, slot0.as_slice()),
                (1, slot1.as_slice()),
                (2, slot2.as_slice()),
            ],
        );
        corrupt_header(&flash, layout.active_header_offset());
        corrupt_payload(&flash, layout.slot_offset(0).unwrap());

        let manager = SlotManager::new(&flash, &flash, &layout.update).unwrap();
        assert_eq!(
            validator::validate(&manager.active_image()),
            UcErrorCode::InvalidChecksum
        );

        let recovery = manager.find_any_valid_candidate().unwrap();
        assert_eq!(recovery.index, 1);
        assert_eq!(recovery.version, 3);
        assert_eq!(
            manager.install(recovery.index, manager.active_header_offset()),
            UcErrorCode::None
        );
        assert_eq!(validator::version(&manager.active_image()), Some(3));
    }

    #[test]
    fn test_validation_of_every_slot_is_stable() {
        init_logger();
        let layout = FlashLayout::default();
        let images: Vec<Vec<u8>> = (0..4).map(|slot| sealed_image(slot + 1, 0x800)).collect();
        let placed: Vec<(usize, &[u8])> = images
            .iter()
            .enumerate()
            .map(|(slot, image)| (slot, image.as_slice()))
            .collect();
        let flash = staged_flash(&layout, None, &placed);
        corrupt_header(&flash, layout.slot_offset(2).unwrap());

        let manager = SlotManager::new(&flash, &flash, &layout.update).unwrap();
        assert_eq!(
            manager.number_of_slots() * manager.slot_size(),
            layout.update.candidates.size
        );
        let first: Vec<UcErrorCode> = (0..manager.number_of_slots())
            .map(|slot| validator::validate(&manager.image_at(slot).unwrap()))
            .collect();
        assert_eq!(
            first,
            vec![
                UcErrorCode::None,
                UcErrorCode::None,
                UcErrorCode::InvalidChecksum,
                UcErrorCode::None
            ]
        );
        for _ in 0..2 {
            let again: Vec<UcErrorCode> = (0..manager.number_of_slots())
                .map(|slot| validator::validate(&manager.image_at(slot).unwrap()))
                .collect();
            assert_eq!(again, first);
        }
        assert_eq!(flash.stats().programs, 0);
    }
}
